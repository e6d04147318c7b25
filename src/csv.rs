//! CSV import and export of catalog records.
//!
//! Only the flat record fields travel through CSV; episodes, engagement
//! counters and bookkeeping timestamps stay in the database. Columns are
//! mapped by position, the header row only fixes how many values a row
//! must carry.

use crate::models::{self, ContentType, DEFAULT_CATEGORY, Movie, MovieForm};

pub const BOM: char = '\u{FEFF}';

pub const HEADERS: [&str; 9] = [
    "title",
    "description",
    "iframe_url",
    "cover_image",
    "rating",
    "category",
    "tags",
    "duration",
    "year",
];

const TAG_SEPARATOR: char = '|';

#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    #[error("the file is not valid UTF-8 text")]
    Encoding,

    #[error("no valid titles found in the CSV file")]
    NoRecords,
}

/// Renders records as CSV, prefixed with a byte-order mark so spreadsheet
/// tools pick up the encoding.
pub fn encode(movies: &[Movie]) -> String {
    let mut lines = Vec::with_capacity(movies.len() + 1);
    lines.push(HEADERS.join(","));

    for movie in movies {
        let row = [
            escape(&movie.title),
            escape(&movie.description),
            escape(&movie.iframe_url),
            escape(&movie.cover_image),
            movie.rating.to_string(),
            escape(&movie.category),
            escape(&movie.tags.join("|")),
            escape(&movie.duration),
            movie.year.map(|y| y.to_string()).unwrap_or_default(),
        ];
        lines.push(row.join(","));
    }

    format!("{BOM}{}", lines.join("\n"))
}

/// Header plus one illustrative row.
pub fn template() -> String {
    let example = [
        "My Example Film",
        "An incredible description",
        "https://player.example.com/embed/example",
        "https://image.tmdb.org/example.jpg",
        "4.5",
        "Action",
        "adventure|superhero|2024",
        "2h 15min",
        "2024",
    ];
    format!("{BOM}{}\n{}", HEADERS.join(","), example.join(","))
}

fn escape(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Splits one CSV line into trimmed fields, honouring quoted commas and
/// doubled quotes.
pub fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            },
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            },
            _ => current.push(c),
        }
    }

    fields.push(current.trim().to_string());
    fields
}

/// Groups physical lines into logical rows. A line break inside an open
/// quoted field belongs to that field.
fn records(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if in_quotes {
            current.push('\n');
        }
        current.push_str(line);
        if line.matches('"').count() % 2 == 1 {
            in_quotes = !in_quotes;
        }
        if !in_quotes {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Decodes CSV text into record drafts.
///
/// Rows with fewer values than the header has columns are skipped, as are
/// rows without a title or a video URL. Neither aborts the import.
pub fn decode(text: &str) -> Vec<MovieForm> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let mut lines = records(text).into_iter().filter(|line| !line.trim().is_empty());

    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let columns = split_line(&header).len();

    let mut out = Vec::new();
    for (row, line) in lines.enumerate() {
        let values = split_line(&line);
        if values.len() < columns {
            tracing::debug!(
                row = row + 1,
                found = values.len(),
                expected = columns,
                "skipping short CSV row"
            );
            continue;
        }
        match decode_row(&values) {
            Some(form) => out.push(form),
            None => tracing::debug!(row = row + 1, "skipping CSV row without title or URL"),
        }
    }
    out
}

/// Decodes an uploaded file. An unreadable or empty import is an error.
pub fn decode_bytes(bytes: &[u8]) -> Result<Vec<MovieForm>, CsvError> {
    let text = std::str::from_utf8(bytes).map_err(|_| CsvError::Encoding)?;
    let forms = decode(text);
    if forms.is_empty() {
        return Err(CsvError::NoRecords);
    }
    Ok(forms)
}

fn decode_row(values: &[String]) -> Option<MovieForm> {
    let get = |idx: usize| values.get(idx).map(String::as_str).unwrap_or_default();

    let title = get(0).trim();
    let iframe_url = get(2).trim();
    if title.is_empty() || iframe_url.is_empty() {
        return None;
    }

    let category = match get(5).trim() {
        "" => DEFAULT_CATEGORY,
        c => c,
    };

    Some(MovieForm {
        title: title.to_string(),
        description: get(1).to_string(),
        iframe_url: iframe_url.to_string(),
        cover_image: get(3).to_string(),
        backdrop_url: None,
        rating: get(4).trim().parse::<f64>().map(models::clamp_rating).unwrap_or(0.0),
        category: category.to_string(),
        tags: models::split_tags(get(6), TAG_SEPARATOR),
        duration: get(7).to_string(),
        year: get(8).trim().parse::<i32>().ok(),
        content_type: ContentType::Film,
        episodes: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use jiff::Timestamp;

    use super::*;

    fn movie(title: &str, url: &str) -> Movie {
        Movie {
            id: title.to_lowercase(),
            user_id: "owner".into(),
            title: title.into(),
            description: String::new(),
            iframe_url: url.into(),
            cover_image: String::new(),
            backdrop_url: None,
            rating: 0.0,
            category: DEFAULT_CATEGORY.into(),
            tags: Vec::new(),
            duration: String::new(),
            year: None,
            is_favorite: false,
            view_count: 0,
            last_viewed_at: None,
            content_type: ContentType::Film,
            episodes: Vec::new(),
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }

    const HEADER: &str =
        "title,description,iframe_url,cover_image,rating,category,tags,duration,year";

    #[test]
    fn split_line_keeps_quoted_commas() {
        assert_eq!(split_line(r#"a,"b,c",d"#), vec!["a", "b,c", "d"]);
    }

    #[test]
    fn split_line_unescapes_doubled_quotes() {
        assert_eq!(split_line(r#"a,"He said ""hi""",c"#), vec!["a", r#"He said "hi""#, "c"]);
    }

    #[test]
    fn split_line_trailing_separator_yields_empty_field() {
        assert_eq!(split_line("a,b,"), vec!["a", "b", ""]);
        assert_eq!(split_line(""), vec![""]);
    }

    #[test]
    fn escape_only_quotes_when_needed() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"x\""), "\"say \"\"x\"\"\"");
        assert_eq!(escape("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn encode_writes_bom_header_and_rows() {
        let mut m = movie("Heat", "https://v.example/heat");
        m.rating = 4.5;
        m.tags = vec!["crime".into(), "heist".into()];
        m.year = Some(1995);
        m.description = "Cops, robbers".into();

        let csv = encode(&[m, movie("Ronin", "https://v.example/ronin")]);
        assert!(csv.starts_with(BOM));
        let lines: Vec<&str> = csv.trim_start_matches(BOM).split('\n').collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(
            lines[1],
            "Heat,\"Cops, robbers\",https://v.example/heat,,4.5,Uncategorized,crime|heist,,1995"
        );
        assert_eq!(lines[2], "Ronin,,https://v.example/ronin,,0,Uncategorized,,,");
        assert!(!csv.ends_with('\n'));
    }

    #[test]
    fn export_then_decode_preserves_flat_fields() {
        let mut a = movie("Heat, the \"director's\" cut", "https://v.example/heat");
        a.category = "Crime".into();
        a.duration = "2h 50min".into();
        a.year = Some(1995);
        a.tags = vec!["heist".into(), "la".into(), "classic".into()];
        let mut b = movie("Ronin", "https://v.example/ronin");
        b.rating = 3.5;

        let decoded = decode(&encode(&[a.clone(), b.clone()]));
        assert_eq!(decoded.len(), 2);

        for (src, out) in [a, b].iter().zip(&decoded) {
            assert_eq!(out.title, src.title);
            assert_eq!(out.iframe_url, src.iframe_url);
            assert_eq!(out.category, src.category);
            assert_eq!(out.duration, src.duration);
            assert_eq!(out.year, src.year);
            assert_eq!(out.rating, src.rating);
            let src_tags: HashSet<_> = src.tags.iter().collect();
            let out_tags: HashSet<_> = out.tags.iter().collect();
            assert_eq!(src_tags, out_tags);
        }
    }

    #[test]
    fn multi_line_descriptions_survive_export() {
        let mut heat = movie("Heat", "https://v.example/heat");
        heat.description = "Line one\nLine two, with a comma".into();
        heat.category = "Crime".into();
        heat.year = Some(1995);

        let decoded = decode(&encode(&[heat, movie("Ronin", "https://v.example/ronin")]));
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].title, "Heat");
        assert_eq!(decoded[0].description, "Line one\nLine two, with a comma");
        assert_eq!(decoded[0].year, Some(1995));
        assert_eq!(decoded[1].title, "Ronin");
    }

    #[test]
    fn quoted_line_breaks_in_crlf_files_are_kept() {
        let text = format!("{HEADER}\r\nHeat,\"a\r\nb\",https://v.example/heat,,0,Crime,,,1995\r\n");
        let decoded = decode(&text);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].description, "a\nb");
    }

    #[test]
    fn decode_drops_rows_without_title_or_url() {
        let text = format!(
            "{HEADER}\n  ,desc,https://v.example/a,,,,,,\nNo url,desc,   ,,,,,,\nKept,,https://v.example/k,,,,,,"
        );
        let decoded = decode(&text);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].title, "Kept");
    }

    #[test]
    fn decode_applies_defaults_for_blank_columns() {
        let decoded = decode(&format!("{HEADER}\nHeat,,https://v.example/heat,,,,,,"));
        let form = &decoded[0];
        assert_eq!(form.rating, 0.0);
        assert_eq!(form.category, DEFAULT_CATEGORY);
        assert!(form.tags.is_empty());
        assert_eq!(form.duration, "");
        assert_eq!(form.year, None);
        assert_eq!(form.content_type, ContentType::Film);
    }

    #[test]
    fn decode_skips_short_rows_without_aborting() {
        let text = format!(
            "{HEADER}\nShort,,https://v.example/s\nFull,,https://v.example/f,,2,Drama,a|b,90min,2001"
        );
        let decoded = decode(&text);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].title, "Full");
        assert_eq!(decoded[0].tags, vec!["a", "b"]);
    }

    #[test]
    fn decode_ignores_extra_trailing_values() {
        let text = format!("{HEADER}\nLong,,https://v.example/l,,1,,,,2010,extra,more");
        let decoded = decode(&text);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].year, Some(2010));
    }

    #[test]
    fn decode_tolerates_short_header_and_missing_columns() {
        let decoded = decode("title,description,iframe_url\nHeat,,https://v.example/heat");
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].category, DEFAULT_CATEGORY);
        assert_eq!(decoded[0].year, None);
    }

    #[test]
    fn decode_coerces_bad_numbers() {
        let decoded = decode(&format!(
            "{HEADER}\nHeat,,https://v.example/heat,,great,,,,soon\nRonin,,https://v.example/r,,12,,,,1998"
        ));
        assert_eq!(decoded[0].rating, 0.0);
        assert_eq!(decoded[0].year, None);
        assert_eq!(decoded[1].rating, 5.0);
    }

    #[test]
    fn decode_handles_crlf_and_blank_lines() {
        let text =
            format!("{HEADER}\r\n\r\n   \r\nHeat,,https://v.example/heat,,3,Crime,,,1995\r\n");
        let decoded = decode(&text);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].year, Some(1995));
        assert_eq!(decoded[0].category, "Crime");
    }

    #[test]
    fn decode_header_only_is_empty() {
        assert!(decode(HEADER).is_empty());
        assert!(decode("").is_empty());
    }

    #[test]
    fn decode_bytes_reports_unreadable_and_empty_files() {
        assert!(matches!(decode_bytes(&[0xff, 0xfe, 0x00]), Err(CsvError::Encoding)));
        assert!(matches!(decode_bytes(HEADER.as_bytes()), Err(CsvError::NoRecords)));
    }

    #[test]
    fn template_decodes_to_its_example_row() {
        let decoded = decode(&template());
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].rating, 4.5);
        assert_eq!(decoded[0].tags, vec!["adventure", "superhero", "2024"]);
        assert_eq!(decoded[0].year, Some(2024));
    }
}
