use serde::{Deserialize, Deserializer, Serialize};

/// Separator used when an author list is flattened into one string
pub const AUTHOR_SEPARATOR: &str = ", ";

/// Paper metadata record
///
/// Serialized with exactly the keys `title`, `authors` and `abstract`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Paper title
    #[serde(default)]
    pub title: String,

    /// Author names, joined with [`AUTHOR_SEPARATOR`] when given as a list
    #[serde(default, deserialize_with = "deserialize_authors")]
    pub authors: String,

    /// Abstract text
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
}

impl Record {
    /// Create new record
    pub fn new(
        title: impl Into<String>,
        authors: impl Into<String>,
        abstract_text: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            authors: authors.into(),
            abstract_text: abstract_text.into(),
        }
    }

    /// Create record from an author list
    pub fn with_author_list<S: AsRef<str>>(
        title: impl Into<String>,
        authors: &[S],
        abstract_text: impl Into<String>,
    ) -> Self {
        Self::new(title, join_authors(authors), abstract_text)
    }

    /// Names of fields that are empty or whitespace only
    pub fn blank_fields(&self) -> Vec<&'static str> {
        let mut blank = Vec::new();
        if self.title.trim().is_empty() {
            blank.push("title");
        }
        if self.authors.trim().is_empty() {
            blank.push("authors");
        }
        if self.abstract_text.trim().is_empty() {
            blank.push("abstract");
        }
        blank
    }
}

/// Join author names into one string
pub fn join_authors<S: AsRef<str>>(authors: &[S]) -> String {
    authors
        .iter()
        .map(|a| a.as_ref().trim())
        .filter(|a| !a.is_empty())
        .collect::<Vec<_>>()
        .join(AUTHOR_SEPARATOR)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AuthorsField {
    Joined(String),
    List(Vec<String>),
}

fn deserialize_authors<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<AuthorsField>::deserialize(deserializer)? {
        Some(AuthorsField::Joined(s)) => s,
        Some(AuthorsField::List(list)) => join_authors(&list),
        None => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_keys() {
        let record = Record::new("Attention", "Vaswani", "We propose");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["title"], "Attention");
        assert_eq!(value["authors"], "Vaswani");
        assert_eq!(value["abstract"], "We propose");
        assert!(value.get("abstract_text").is_none());
    }

    #[test]
    fn test_authors_list_is_joined() {
        let json = r#"{"title": "T", "authors": ["Ada Lovelace", " Alan Turing "], "abstract": "A"}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.authors, "Ada Lovelace, Alan Turing");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let record: Record = serde_json::from_str(r#"{"title": "Only title"}"#).unwrap();
        assert_eq!(record.title, "Only title");
        assert!(record.authors.is_empty());
        assert_eq!(record.blank_fields(), vec!["authors", "abstract"]);
    }

    #[test]
    fn test_null_authors() {
        let record: Record =
            serde_json::from_str(r#"{"title": "T", "authors": null, "abstract": "A"}"#).unwrap();
        assert!(record.authors.is_empty());
    }

    #[test]
    fn test_with_author_list() {
        let record = Record::with_author_list("T", &["A", "", "B"], "X");
        assert_eq!(record.authors, "A, B");
    }
}
