//! Localized prompt templates.
//!
//! Each template tells the model, in the language of the text, to turn the
//! narration into a diagram. The response schema is always described in
//! English since its field names are fixed.

use narragraph_text::Language;

const RESPONSE_SCHEMA: &str = r#"Respond with a single JSON object and nothing else:
{
  "type": "flow" | "tree" | "timeline" | "matrix" | "cycle",
  "nodes": [{ "id": "n1", "label": "short label" }],
  "edges": [{ "from": "n1", "to": "n2", "label": "optional" }],
  "confidence": 0.0-1.0,
  "reasoning": "one sentence"
}
Use at most 12 nodes and labels of at most 6 words."#;

fn instruction(language: Language) -> &'static str {
    match language {
        Language::En => {
            "Analyze the following narration and extract the diagram that best explains it."
        }
        Language::Es => {
            "Analiza la siguiente narración y extrae el diagrama que mejor la explique."
        }
        Language::Fr => {
            "Analysez la narration suivante et extrayez le diagramme qui l'explique le mieux."
        }
        Language::De => {
            "Analysiere die folgende Erzählung und extrahiere das Diagramm, das sie am besten erklärt."
        }
        Language::Pt => {
            "Analise a narração a seguir e extraia o diagrama que melhor a explica."
        }
        Language::It => {
            "Analizza la seguente narrazione ed estrai il diagramma che la spiega meglio."
        }
        Language::Zh => "分析以下叙述，并提取最能解释它的图表。",
        Language::Ja => "次のナレーションを分析し、それを最もよく説明する図を抽出してください。",
        Language::Ko => "다음 내레이션을 분석하고 이를 가장 잘 설명하는 다이어그램을 추출하세요.",
        Language::Ru => {
            "Проанализируйте следующий рассказ и извлеките диаграмму, которая лучше всего его объясняет."
        }
        Language::Ar => "حلّل السرد التالي واستخرج المخطط الذي يشرحه على أفضل وجه.",
    }
}

/// Build the system prompt for a text in `language`.
///
/// Node labels are requested in the language of the text.
pub fn prompt_for(language: Language) -> String {
    format!(
        "{}\nWrite node labels in the language with code `{}`.\n\n{RESPONSE_SCHEMA}",
        instruction(language),
        language.code(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_are_localized() {
        let english = prompt_for(Language::En);
        let spanish = prompt_for(Language::Es);

        assert!(english.starts_with("Analyze"));
        assert!(spanish.starts_with("Analiza"));
        assert!(spanish.contains("`es`"));
        for prompt in [english, spanish] {
            assert!(prompt.contains("\"nodes\""));
        }
    }
}
