//! # 結果レポートと集約
//!
//! 各ステージの結果を、ラベルをキーとした順序付きのレポートにまとめる。
//!
//! ## 順序
//!
//! 完了順ではなく、ステージ順 → レジストリ順で並べる。並行実行しても
//! レポートの並びは常に同じになる。
//!
//! ```text
//! [直接参照コレクション（レジストリ順）] [埋め込み配列（レジストリ順）] [AccountReset]
//! ```

use serde::{
    Serialize,
    Serializer,
    ser::{SerializeMap, SerializeStruct},
};

use super::{CountMeaning, PurgeOutcome, PurgeStage};

/// アカウントリセットステップのレポートラベル
pub const ACCOUNT_RESET_LABEL: &str = "AccountReset";

/// ステージ内の位置情報付きの結果
///
/// `position` はステージ内のレジストリ上の位置。集約時の並び順に使う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    pub stage:    PurgeStage,
    pub position: usize,
    pub label:    String,
    pub outcome:  PurgeOutcome,
}

impl StageOutcome {
    pub fn new(
        stage: PurgeStage,
        position: usize,
        label: impl Into<String>,
        outcome: PurgeOutcome,
    ) -> Self {
        Self {
            stage,
            position,
            label: label.into(),
            outcome,
        }
    }
}

/// レポートの 1 エントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub label:   String,
    pub meaning: CountMeaning,
    pub outcome: PurgeOutcome,
}

/// テナントデータ削除の結果レポート
///
/// 部分失敗時も全エントリを含む。成功を全体の成功とみなすか、再実行するかは
/// 呼び出し元が判断する。返却後は変更しない。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PurgeReport {
    entries:     Vec<ReportEntry>,
    cancelled:   bool,
    not_started: Vec<String>,
}

/// 結果を集約してレポートを作成する
///
/// 副作用のない純粋関数。実行途中の部分的な結果に対して何度呼んでもよい。
///
/// - ステージ順 → ステージ内の位置順に並べる（同順位は入力順を保つ）
/// - 同じラベルが複数ある場合は最初の結果を採用し、上書きしない
/// - 結果を記録しないステージ（`Initialized` など）の値は無視する
pub fn aggregate(outcomes: impl IntoIterator<Item = StageOutcome>) -> PurgeReport {
    let mut ordered: Vec<StageOutcome> = outcomes.into_iter().collect();
    ordered.sort_by_key(|o| (o.stage, o.position));

    let mut entries: Vec<ReportEntry> = Vec::with_capacity(ordered.len());
    for outcome in ordered {
        let Some(meaning) = outcome.stage.count_meaning() else {
            continue;
        };
        if entries.iter().any(|e| e.label == outcome.label) {
            continue;
        }
        entries.push(ReportEntry {
            label: outcome.label,
            meaning,
            outcome: outcome.outcome,
        });
    }

    PurgeReport {
        entries,
        cancelled: false,
        not_started: Vec::new(),
    }
}

impl PurgeReport {
    /// キャンセルされたことを記録したレポートを返す
    ///
    /// `not_started` は発行されなかったコレクションのラベル。
    pub fn with_cancellation(mut self, not_started: Vec<String>) -> Self {
        self.cancelled = true;
        self.not_started = not_started;
        self
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// ラベルに対応する結果
    pub fn get(&self, label: &str) -> Option<&PurgeOutcome> {
        self.entry(label).map(|e| &e.outcome)
    }

    /// ラベルに対応する件数の意味
    pub fn meaning_of(&self, label: &str) -> Option<CountMeaning> {
        self.entry(label).map(|e| e.meaning)
    }

    /// ラベル一覧（レポート順）
    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }

    /// いずれかのエントリが失敗したかどうか
    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|e| e.outcome.is_failed())
    }

    /// 失敗したエントリのラベルとメッセージ
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .filter_map(|e| match &e.outcome {
                PurgeOutcome::Failed(message) => Some((e.label.as_str(), message.as_str())),
                PurgeOutcome::Deleted(_) => None,
            })
            .collect()
    }

    /// 指定した意味の件数の合計（失敗は数えない）
    pub fn total(&self, meaning: CountMeaning) -> u64 {
        self.entries
            .iter()
            .filter(|e| e.meaning == meaning)
            .filter_map(|e| e.outcome.count())
            .sum()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn not_started(&self) -> &[String] {
        &self.not_started
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, label: &str) -> Option<&ReportEntry> {
        self.entries.iter().find(|e| e.label == label)
    }
}

/// `{"entries": {...}, "meanings": {...}, "cancelled": .., "not_started": [..]}`
impl Serialize for PurgeReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PurgeReport", 4)?;
        state.serialize_field("entries", &OutcomeMap(&self.entries))?;
        state.serialize_field("meanings", &MeaningMap(&self.entries))?;
        state.serialize_field("cancelled", &self.cancelled)?;
        state.serialize_field("not_started", &self.not_started)?;
        state.end()
    }
}

struct OutcomeMap<'a>(&'a [ReportEntry]);

impl Serialize for OutcomeMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in self.0 {
            map.serialize_entry(&entry.label, &entry.outcome)?;
        }
        map.end()
    }
}

struct MeaningMap<'a>(&'a [ReportEntry]);

impl Serialize for MeaningMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in self.0 {
            map.serialize_entry(&entry.label, &entry.meaning)?;
        }
        map.end()
    }
}
