//! 结果记录与结果集
//!
//! 记录对核心来说是不透明的键值映射，这里只关心顺序、取值和错误标记。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;

/// 标记整批失败的字段名
pub const ERROR_MARKER_FIELD: &str = "error";

/// 汇总视图中按不同取值计数的字段
pub const GROUPING_FIELDS: [&str; 2] = ["municipio", "cultivo_establecer"];

/// 单个字段的取值
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(Number),
    /// 缺失、null 或非标量
    Absent,
}

impl FieldValue {
    fn from_json(value: Option<&JsonValue>) -> Self {
        match value {
            Some(JsonValue::String(s)) => FieldValue::Text(s.clone()),
            Some(JsonValue::Number(n)) => FieldValue::Number(n.clone()),
            _ => FieldValue::Absent,
        }
    }

    /// 显示用文本；空字符串视为缺失
    pub fn display(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) if !s.trim().is_empty() => Some(s.clone()),
            FieldValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// 单条分析记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultRecord(Map<String, JsonValue>);

impl ResultRecord {
    pub fn new(fields: Map<String, JsonValue>) -> Self {
        Self(fields)
    }

    /// 读取字段
    pub fn get(&self, field: &str) -> FieldValue {
        FieldValue::from_json(self.0.get(field))
    }

    /// 字段的显示文本
    pub fn text(&self, field: &str) -> Option<String> {
        self.get(field).display()
    }

    /// 错误标记：`error` 字段存在且为真值时返回其内容
    pub fn error_marker(&self) -> Option<String> {
        match self.0.get(ERROR_MARKER_FIELD)? {
            JsonValue::Null | JsonValue::Bool(false) => None,
            JsonValue::String(s) if s.is_empty() => None,
            JsonValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<JsonValue> for ResultRecord {
    /// 非对象元素按空记录处理，保持位置不变
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

/// 一次提交得到的有序结果集，收到后不可变
///
/// 克隆只复制 Arc，替换整个结果集而不是原地修改。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    records: Arc<[ResultRecord]>,
}

impl ResultSet {
    pub fn new(records: Vec<ResultRecord>) -> Self {
        Self {
            records: records.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ResultRecord> {
        self.records.get(index)
    }

    pub fn first(&self) -> Option<&ResultRecord> {
        self.records.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResultRecord> {
        self.records.iter()
    }

    /// 取连续区间，越界部分被截断
    pub fn slice(&self, range: Range<usize>) -> &[ResultRecord] {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        &self.records[start..end]
    }

    /// 汇总：总数与分组字段的不同取值数
    pub fn summary(&self) -> ResultSummary {
        let distinct = GROUPING_FIELDS
            .iter()
            .map(|field| {
                let values: HashSet<String> =
                    self.iter().filter_map(|r| r.text(field)).collect();
                (*field, values.len())
            })
            .collect();

        ResultSummary {
            total: self.len(),
            distinct,
        }
    }
}

impl Serialize for ResultSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.records.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ResultSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Vec::<ResultRecord>::deserialize(deserializer).map(Self::new)
    }
}

impl FromIterator<ResultRecord> for ResultSet {
    fn from_iter<I: IntoIterator<Item = ResultRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// 汇总视图，每个结果集只计算一次
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSummary {
    pub total: usize,
    pub distinct: Vec<(&'static str, usize)>,
}

impl ResultSummary {
    pub fn distinct_of(&self, field: &str) -> Option<usize> {
        self.distinct
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, count)| *count)
    }
}
