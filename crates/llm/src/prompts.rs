//! Prompt templates for metadata extraction

/// System prompt for first-page metadata extraction
pub const METADATA_SYSTEM_PROMPT: &str = r#"You extract bibliographic metadata from the first page of an academic paper.
Return the paper's title, the author names, and the abstract.
Copy the abstract verbatim from the page. Do not summarize or rephrase it.
Respond with a single JSON object with exactly these keys: "title", "authors", "abstract".
"authors" is a list of author names. Use an empty string or empty list for anything not present on the page.
Do not add any other keys or text."#;

/// User prompt when the page is supplied as an image
pub const IMAGE_PROMPT: &str = "Extract the metadata from this page image.";

/// User prompt when the page is supplied as extracted text
pub fn text_prompt(page_text: &str) -> String {
    format!(
        "Extract the metadata from this page text:\n---\n{}\n---",
        page_text
    )
}
