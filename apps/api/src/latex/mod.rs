// LaTeX: template loading and clean-up of the model's filled template.

pub mod template;

pub use template::{TemplateError, TemplateLoader};

use crate::llm_client::strip_code_fences;

const END_DOCUMENT: &str = "\\end{document}";

/// Cleans the LaTeX stage output so it compiles as a standalone document.
///
/// Strips markdown fences and restores `\end{document}` when the template had
/// one and the model dropped it.
pub fn finalize_latex(raw: &str, template: &str) -> String {
    let mut body = strip_code_fences(raw).to_string();
    if template.contains(END_DOCUMENT) && !body.contains(END_DOCUMENT) {
        body.push('\n');
        body.push_str(END_DOCUMENT);
    }
    body.push('\n');
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "\\begin{document}\n%BODY\n\\end{document}\n";

    #[test]
    fn test_finalize_strips_fences() {
        let raw = "```latex\n\\begin{document}\nHi\n\\end{document}\n```";
        assert_eq!(
            finalize_latex(raw, TEMPLATE),
            "\\begin{document}\nHi\n\\end{document}\n"
        );
    }

    #[test]
    fn test_finalize_restores_missing_end_document() {
        let out = finalize_latex("\\begin{document}\nHi", TEMPLATE);
        assert!(out.ends_with("\\end{document}\n"));
        assert_eq!(out.matches(END_DOCUMENT).count(), 1);
    }

    #[test]
    fn test_finalize_leaves_fragment_templates_alone() {
        let out = finalize_latex("\\section{Skills}", "\\section{SECTION}");
        assert_eq!(out, "\\section{Skills}\n");
    }
}
