//! 显示条目
//!
//! 每条记录物化为一个显示条目，编号从 1 开始，与记录在结果集中的位置一一对应。

use super::labels::{self, Interpretation, DISPLAY_FIELDS};
use super::record::ResultRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayField {
    pub label: String,
    pub value: String,
    pub interpretation: Interpretation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayItem {
    /// 1-based 序号
    pub number: usize,
    pub fields: Vec<DisplayField>,
}

impl DisplayItem {
    pub fn from_record(number: usize, record: &ResultRecord) -> Self {
        let fields = DISPLAY_FIELDS
            .iter()
            .map(|(field, unit)| {
                let value = match record.text(field) {
                    Some(v) if unit.is_empty() => v,
                    Some(v) => format!("{} {}", v, unit),
                    None => labels::missing_text(field).to_string(),
                };
                let interpretation = record
                    .text(&labels::interpretation_key(field))
                    .map(|t| Interpretation::classify(&t))
                    .unwrap_or(Interpretation::Unknown);
                DisplayField {
                    label: labels::label_for(field).to_string(),
                    value,
                    interpretation,
                }
            })
            .collect();

        Self { number, fields }
    }

    pub fn title(&self) -> String {
        format!("Registro {}", self.number)
    }

    pub fn field(&self, label: &str) -> Option<&DisplayField> {
        self.fields.iter().find(|f| f.label == label)
    }
}

/// "加载更多"控件，标注当前进度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadMoreControl {
    pub rendered: usize,
    pub total: usize,
}

impl LoadMoreControl {
    pub fn label(&self) -> String {
        format!("Load more records ({}/{})", self.rendered, self.total)
    }
}
