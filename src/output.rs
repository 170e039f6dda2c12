//! JSON response types and formatting for CLI output.

use serde::Serialize;

use recollect::{Memory, MemorySearchResult, RelatedMemory};

/// Response for a store call.
#[derive(Serialize)]
pub struct StoreResponse {
    pub status: &'static str,
    pub id: String,
}

impl StoreResponse {
    pub fn new(id: String, is_duplicate: bool) -> Self {
        Self {
            status: if is_duplicate { "merged" } else { "stored" },
            id,
        }
    }
}

/// Response for search results.
#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
}

/// Individual search result item.
#[derive(Serialize)]
pub struct SearchResultItem {
    pub id: String,
    pub content: String,
    pub category: String,
    pub score: f64,
    pub created_at: i64,
}

impl From<MemorySearchResult> for SearchResultItem {
    fn from(result: MemorySearchResult) -> Self {
        Self {
            id: result.memory.id,
            content: result.memory.content,
            category: result.memory.category.to_string(),
            score: result.score,
            created_at: result.memory.created_at,
        }
    }
}

/// Response for related memories.
#[derive(Serialize)]
pub struct RelatedResponse {
    pub related: Vec<RelatedItem>,
}

#[derive(Serialize)]
pub struct RelatedItem {
    pub id: String,
    pub relation: String,
    pub content: String,
}

impl From<RelatedMemory> for RelatedItem {
    fn from(related: RelatedMemory) -> Self {
        Self {
            id: related.memory.id,
            relation: related.relation,
            content: related.memory.content,
        }
    }
}

/// Response for deletions by id.
#[derive(Serialize)]
pub struct DeleteResponse {
    pub status: &'static str,
    pub id: String,
}

/// Response for operations that report a count.
#[derive(Serialize)]
pub struct CountResponse {
    pub status: &'static str,
    pub count: usize,
}

/// Response for link creation.
#[derive(Serialize)]
pub struct LinkResponse {
    pub status: &'static str,
    pub from: String,
    pub to: String,
    pub relation: String,
}

/// Response for errors.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Print a value as formatted JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize JSON: {}", e);
            std::process::exit(1);
        }
    }
}

/// Render a millisecond timestamp for humans.
pub fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

/// First line of `content`, cut to `max` characters.
pub fn preview(content: &str, max: usize) -> String {
    let line = content.lines().next().unwrap_or("");
    let mut out: String = line.chars().take(max).collect();
    if line.chars().count() > max || content.lines().nth(1).is_some() {
        out.push('…');
    }
    out
}

pub fn print_memory_line(memory: &Memory) {
    println!(
        "{} [{}] {}",
        memory.id,
        memory.category,
        preview(&memory.content, 100)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_store_response() {
        let json = serde_json::to_string(&StoreResponse::new("test-id".to_string(), true)).unwrap();
        assert!(json.contains("\"status\":\"merged\""));
        assert!(json.contains("\"id\":\"test-id\""));
    }

    #[test]
    fn test_serialize_search_response() {
        let response = SearchResponse {
            results: vec![SearchResultItem {
                id: "test-id".to_string(),
                content: "test content".to_string(),
                category: "preference".to_string(),
                score: 0.95,
                created_at: 1_700_000_000_000,
            }],
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"results\""));
        assert!(json.contains("\"score\":0.95"));
        assert!(json.contains("\"category\":\"preference\""));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("abcdefghij", 4), "abcd…");
        assert_eq!(preview("line one\nline two", 50), "line one…");
    }
}
