// Report layout template
//
// The template is a JSON array of drawing instructions tagged by `type`,
// applied in order by the renderer.

use serde::{Deserialize, Serialize};

/// Columns a `table` row is projected onto when the template names none
pub const DEFAULT_TABLE_COLUMNS: [&str; 3] = ["action", "qui", "quand"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutElement {
    /// Centered document title
    Header { text: String },

    /// `{prefix}{date}{suffix}{time}` stamped at render time
    DateTime {
        #[serde(default)]
        text_prefix: String,
        #[serde(default)]
        text_suffix: String,
    },

    /// Accent title; `{{dotted.path}}` placeholders are filled from the data
    SectionTitle { text: String },

    MainSectionTitle { text: String },

    /// Like `main_section_title` but always opens a new page
    MainSectionTitleAppendix { text: String },

    SubSectionTitle { text: String },

    Text {
        data_path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },

    /// `{key} {value}`, skipped when the value is empty
    KeyValueText { key: String, data_path: String },

    /// Array of strings rendered as `- item` lines
    List { data_path: String },

    /// Array of `{question, reponse}` objects, one line each
    #[serde(rename = "list_5_why")]
    List5Why { data_path: String },

    Table {
        data_path: String,
        #[serde(default)]
        headers: Vec<String>,
        /// Row fields projected onto the columns, in order
        #[serde(default, skip_serializing_if = "Option::is_none")]
        columns: Option<Vec<String>>,
    },

    /// The whole discussion, one paragraph per turn
    ChatTranscript {},
}

impl LayoutElement {
    /// Template `type` tag, used in warnings
    pub fn kind(&self) -> &'static str {
        match self {
            LayoutElement::Header { .. } => "header",
            LayoutElement::DateTime { .. } => "date_time",
            LayoutElement::SectionTitle { .. } => "section_title",
            LayoutElement::MainSectionTitle { .. } => "main_section_title",
            LayoutElement::MainSectionTitleAppendix { .. } => "main_section_title_appendix",
            LayoutElement::SubSectionTitle { .. } => "sub_section_title",
            LayoutElement::Text { .. } => "text",
            LayoutElement::KeyValueText { .. } => "key_value_text",
            LayoutElement::List { .. } => "list",
            LayoutElement::List5Why { .. } => "list_5_why",
            LayoutElement::Table { .. } => "table",
            LayoutElement::ChatTranscript {} => "chat_transcript",
        }
    }
}

/// Ordered layout instructions, immutable once loaded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportTemplate(Vec<LayoutElement>);

impl ReportTemplate {
    pub fn new(elements: Vec<LayoutElement>) -> Self {
        Self(elements)
    }

    pub fn elements(&self) -> &[LayoutElement] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<LayoutElement>> for ReportTemplate {
    fn from(elements: Vec<LayoutElement>) -> Self {
        Self(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_all_variants() {
        let template: ReportTemplate = serde_json::from_value(json!([
            {"type": "header", "text": "Rapport QRQC"},
            {"type": "date_time", "text_prefix": "Généré le ", "text_suffix": " à "},
            {"type": "section_title", "text": "Problème : {{titre_probleme}}"},
            {"type": "main_section_title", "text": "1. Détection"},
            {"type": "sub_section_title", "text": "Qui ?"},
            {"type": "text", "data_path": "etape1.qui", "title": "Qui"},
            {"type": "key_value_text", "key": "Où :", "data_path": "etape1.ou"},
            {"type": "list", "data_path": "etape2.faits"},
            {"type": "list_5_why", "data_path": "etape3.cinq_pourquoi"},
            {"type": "table", "data_path": "plan_actions", "headers": ["Action", "Qui", "Quand"]},
            {"type": "main_section_title_appendix", "text": "Annexe"},
            {"type": "chat_transcript"}
        ]))
        .unwrap();

        assert_eq!(template.len(), 12);
        assert_eq!(template.elements()[8].kind(), "list_5_why");
        assert_eq!(template.elements()[11], LayoutElement::ChatTranscript {});
        assert!(matches!(
            &template.elements()[9],
            LayoutElement::Table { columns: None, headers, .. } if headers.len() == 3
        ));
    }

    #[test]
    fn test_text_without_title() {
        let element: LayoutElement =
            serde_json::from_value(json!({"type": "text", "data_path": "a.b"})).unwrap();
        assert_eq!(
            element,
            LayoutElement::Text {
                data_path: "a.b".into(),
                title: None
            }
        );
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result: Result<ReportTemplate, _> =
            serde_json::from_value(json!([{"type": "pie_chart", "data_path": "x"}]));
        assert!(result.is_err());
    }
}
