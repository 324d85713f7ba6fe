//! `dataview-demo`: pages through a JSON array of rows with a
//! `ListDataProviderView` and prints each page as one JSON line.
//!
//! ```text
//! dataview-demo rows.json --from 7 --size 5 --sort name:desc --rename name=label
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use dataview::{
    ArrayDataProvider, ArrayProviderConfig, DataProvider, KeyAttributes, ListDataProviderView,
    ViewOptions,
};
use dataview_core::{FetchListParameters, FieldRenameMapping, IteratorResult, Key, SortCriterion, Value};
use futures_util::StreamExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dataview-demo", version, about = "Page through JSON rows with a list data provider view")]
struct Args {
    /// JSON file holding an array of row objects.
    #[arg(env = "DATAVIEW_FILE")]
    file: PathBuf,

    /// Key field. Give several (comma-separated) for a composite key.
    #[arg(long = "key", env = "DATAVIEW_KEY", value_delimiter = ',')]
    keys: Vec<String>,

    /// Start at the row with this key. Integers are read as integer keys.
    #[arg(long, env = "DATAVIEW_FROM")]
    from: Option<String>,

    /// Rows to skip after the start row.
    #[arg(long, env = "DATAVIEW_OFFSET", default_value_t = 0)]
    offset: usize,

    /// Page size; 0 lets the provider choose.
    #[arg(long, env = "DATAVIEW_SIZE", default_value_t = 10)]
    size: i64,

    /// Sort criteria as `attribute[:asc|desc]`, comma-separated.
    #[arg(long, env = "DATAVIEW_SORT", value_delimiter = ',', value_parser = parse_sort)]
    sort: Vec<SortCriterion>,

    /// Field renames as `provider=view`, comma-separated.
    #[arg(long = "rename", env = "DATAVIEW_RENAME", value_delimiter = ',', value_parser = parse_rename)]
    renames: Vec<(String, String)>,

    /// Stop after this many pages.
    #[arg(long, env = "DATAVIEW_MAX_PAGES")]
    max_pages: Option<usize>,
}

fn parse_sort(raw: &str) -> Result<SortCriterion, String> {
    let (attribute, direction) = raw.split_once(':').unwrap_or((raw, "asc"));
    if attribute.is_empty() {
        return Err(format!("missing sort attribute in `{raw}`"));
    }
    match direction.to_ascii_lowercase().as_str() {
        "asc" | "ascending" => Ok(SortCriterion::ascending(attribute)),
        "desc" | "descending" => Ok(SortCriterion::descending(attribute)),
        other => Err(format!("unknown sort direction `{other}`")),
    }
}

fn parse_rename(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((from, to)) if !from.is_empty() && !to.is_empty() => {
            Ok((from.to_string(), to.to_string()))
        }
        _ => Err(format!("expected `provider=view`, got `{raw}`")),
    }
}

fn parse_key(raw: &str) -> Key {
    raw.parse::<i64>()
        .map_or_else(|_| Key::from(raw), Key::Int)
}

fn key_attributes(keys: &[String]) -> KeyAttributes {
    match keys {
        [] => KeyAttributes::Default,
        [single] => KeyAttributes::Attribute(single.clone()),
        many => KeyAttributes::Composite(many.to_vec()),
    }
}

fn load_rows(path: &Path) -> anyhow::Result<Vec<Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {} as JSON", path.display()))?;
    let serde_json::Value::Array(rows) = json else {
        bail!("{} does not hold a JSON array", path.display());
    };
    Ok(rows.into_iter().map(Value::from).collect())
}

/// One page in plain JSON form.
fn page_json(page: IteratorResult) -> serde_json::Value {
    let start_index = page.value.start_index;
    let (keys, data) = page.value.into_parts();
    serde_json::json!({
        "done": page.done,
        "startIndex": start_index,
        "keys": keys
            .into_iter()
            .map(|key| serde_json::Value::from(Value::from(key)))
            .collect::<Vec<_>>(),
        "data": data.into_iter().map(serde_json::Value::from).collect::<Vec<_>>(),
    })
}

/// Runs the view described by `args`, writing one line per page to `out`.
/// Returns the number of pages written.
async fn run<W: Write>(args: Args, out: &mut W) -> anyhow::Result<usize> {
    let rows = load_rows(&args.file)?;
    let config = ArrayProviderConfig {
        key_attributes: key_attributes(&args.keys),
        ..ArrayProviderConfig::default()
    };
    let provider = ArrayDataProvider::new(rows, config)
        .with_context(|| format!("failed to load rows from {}", args.file.display()))?;

    let options = ViewOptions {
        from: args.from.as_deref().map(parse_key),
        offset: args.offset,
        sort_criteria: (!args.sort.is_empty()).then_some(args.sort),
        filter_criterion: None,
        data_mapping: if args.renames.is_empty() {
            None
        } else {
            Some(Arc::new(FieldRenameMapping::new(args.renames)))
        },
    };
    let view = ListDataProviderView::new(Arc::new(provider), options);

    let mut pages = view.fetch_first(FetchListParameters::with_size(args.size));
    let mut written = 0_usize;
    while let Some(page) = pages.next().await {
        let page = page.context("failed to fetch page")?;
        let done = page.done;
        writeln!(out, "{}", page_json(page))?;
        written += 1;
        if done || args.max_pages.is_some_and(|max| written >= max) {
            break;
        }
    }
    tracing::info!(pages = written, "finished paging");
    Ok(written)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::debug!(?args, "starting dataview-demo");
    let stdout = std::io::stdout();
    run(args, &mut stdout.lock()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use dataview_core::SortDirection;

    use super::*;

    fn rows_file(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    fn args(file: &tempfile::NamedTempFile, extra: &[&str]) -> Args {
        let path = file.path().to_str().unwrap();
        Args::try_parse_from(["dataview-demo", path].into_iter().chain(extra.iter().copied())).unwrap()
    }

    fn lines(out: &[u8]) -> Vec<serde_json::Value> {
        std::str::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    const ROWS: &str = r#"[
        {"id": 1, "name": "a"},
        {"id": 2, "name": "b"},
        {"id": 3, "name": "c"},
        {"id": 4, "name": "d"}
    ]"#;

    #[test]
    fn parses_sort_and_rename_flags() {
        let sort = parse_sort("name:desc").unwrap();
        assert_eq!(sort.attribute, "name");
        assert_eq!(sort.direction, SortDirection::Descending);
        assert_eq!(parse_sort("id").unwrap().direction, SortDirection::Ascending);
        assert!(parse_sort("id:sideways").is_err());

        assert_eq!(parse_rename("name=label").unwrap(), ("name".into(), "label".into()));
        assert!(parse_rename("name").is_err());

        assert_eq!(parse_key("7"), Key::Int(7));
        assert_eq!(parse_key("x7"), Key::from("x7"));
    }

    #[test]
    fn key_flags_select_key_attributes() {
        assert_eq!(key_attributes(&[]), KeyAttributes::Default);
        assert_eq!(key_attributes(&["sku".into()]), KeyAttributes::Attribute("sku".into()));
        assert_eq!(
            key_attributes(&["a".into(), "b".into()]),
            KeyAttributes::Composite(vec!["a".into(), "b".into()])
        );
    }

    #[tokio::test]
    async fn prints_one_line_per_page() {
        let file = rows_file(ROWS);
        let mut out = Vec::new();
        let written = run(args(&file, &["--from", "2", "--size", "2", "--rename", "name=label"]), &mut out)
            .await
            .unwrap();

        assert_eq!(written, 2);
        let pages = lines(&out);
        assert_eq!(pages[0]["keys"], serde_json::json!([2, 3]));
        assert_eq!(pages[0]["data"][0]["label"], "b");
        assert_eq!(pages[0]["done"], false);
        assert_eq!(pages[1]["keys"], serde_json::json!([4]));
        assert_eq!(pages[1]["startIndex"], 2);
        assert_eq!(pages[1]["done"], true);
    }

    #[tokio::test]
    async fn max_pages_stops_early() {
        let file = rows_file(ROWS);
        let mut out = Vec::new();
        let written = run(args(&file, &["--size", "1", "--max-pages", "2", "--sort", "name:desc"]), &mut out)
            .await
            .unwrap();

        assert_eq!(written, 2);
        assert_eq!(lines(&out)[0]["keys"], serde_json::json!([4]));
    }

    #[tokio::test]
    async fn rejects_non_array_input() {
        let file = rows_file(r#"{"id": 1}"#);
        let err = run(args(&file, &[]), &mut Vec::new()).await.err().unwrap();
        assert!(err.to_string().contains("does not hold a JSON array"));
    }

    #[tokio::test]
    async fn rows_without_keys_are_reported() {
        let file = rows_file(r#"[{"name": "a"}]"#);
        let err = run(args(&file, &[]), &mut Vec::new()).await.err().unwrap();
        assert!(format!("{err:#}").contains("id"));
    }
}
