//! Instruction text sent to the model with every file.
//!
//! The structural template fixes the Markdown headings that
//! [`crate::sections::parse_analysis`] looks for. Editing the headings here
//! without updating the parser makes section extraction fall back to `N/A`.

/// Fixed template appended after the file content part(s).
///
/// Asks for four Markdown-headed sections: Document Type, Summary,
/// Key Information & Localization, Category.
pub const ANALYSIS_TEMPLATE: &str = r#"Act as an expert document analyst and answer the instruction above using the attached document (an image, a text file, or rendered PDF pages).

Structure your answer with these Markdown sections, in this order, each introduced by a bold heading such as **Summary:**

**Document Type:** Identify the kind of document (e.g. handwritten notes, typed essay, scientific paper, form, receipt, invoice, general text). For images, say whether it looks scanned or photographed and whether handwriting is present.

**Summary:** One or two sentences on the main topic or purpose.

**Key Information & Localization:** A bulleted list of the crucial facts: main points, numbers, dates, names, definitions, form fields with their values, or the core answers of student work. After each item, state precisely where it appears:
  - text files: approximate line number or paragraph;
  - images and PDF pages: page number and visual position (e.g. "top-left corner", "table row 3, column 2", "handwritten in the bottom margin").

**Category:** A single short label for the document (e.g. Finance, Research Paper, Legal, Correspondence, Education, Other).

Do not add other top-level sections. If something cannot be determined, write "Unknown" under that heading."#;

/// Instruction used by batch runs when none is given.
pub const DEFAULT_BATCH_PROMPT: &str =
    "Analyze this document and extract its key information.";

/// Message attached to an empty text input instead of calling the model.
pub const EMPTY_TEXT_MESSAGE: &str = "Input text file is empty.";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::parse_analysis;

    #[test]
    fn template_names_every_parsed_section() {
        for heading in [
            "**Document Type:**",
            "**Summary:**",
            "**Key Information & Localization:**",
            "**Category:**",
        ] {
            assert!(ANALYSIS_TEMPLATE.contains(heading), "missing {heading}");
        }
    }

    #[test]
    fn answer_in_template_shape_parses() {
        let answer = "**Document Type:** Receipt\n\n**Summary:** A grocery receipt.\n\n**Key Information & Localization:**\n- Total 12.40 (bottom right)\n\n**Category:** Finance";
        let parsed = parse_analysis(answer);
        assert_eq!(parsed.document_type, "Receipt");
        assert_eq!(parsed.category, "Finance");
    }
}
