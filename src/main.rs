//! page-flow CLI: paginate a JSON document description headlessly
//!
//! ```text
//! page-flow doc.json --options options.json --pretty
//! ```
//!
//! The document is a list of blocks, each `{"type": "paragraph", "lines": 3}`
//! or `{"type": "pb", "direction": "before"}`. The report lists the page
//! count and every break record once the layout has settled.

use clap::Parser;
use env_logger::{Builder, Env};
use log::{error, info};
use page_flow::document::ATTR_DIRECTION;
use page_flow::render::{ATTR_LINES, ATTR_LINE_HEIGHT, ATTR_MARGIN_BOTTOM, ATTR_MARGIN_TOP, ATTR_ROWS};
use page_flow::{
    BreakId, Direction, Document, HeadlessView, Node, PaginationOptions, Paginator, Result,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "page-flow",
    version,
    about = "Paginate a document description with the headless layout",
    arg_required_else_help = true
)]
struct Cli {
    /// Document description (JSON)
    input: PathBuf,
    /// Pagination options (JSON); overrides options embedded in the document
    #[arg(long)]
    options: Option<PathBuf>,
    /// Pretty-print the report
    #[arg(long)]
    pretty: bool,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct DocumentInput {
    #[serde(default)]
    options: Option<PaginationOptions>,
    blocks: Vec<BlockInput>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct BlockInput {
    #[serde(rename = "type", default = "default_block_type")]
    kind: String,
    #[serde(default)]
    direction: Option<String>,
    #[serde(default)]
    lines: Option<u32>,
    #[serde(default)]
    line_height: Option<f32>,
    #[serde(default)]
    margin_top: Option<f32>,
    #[serde(default)]
    margin_bottom: Option<f32>,
    #[serde(default)]
    rows: Vec<f32>,
}

fn default_block_type() -> String {
    "paragraph".to_string()
}

impl BlockInput {
    fn into_node(self) -> Result<Node> {
        if self.kind == page_flow::document::PAGE_BREAK_NODE {
            let direction: Direction = match self.direction.as_deref() {
                Some(d) => d.parse()?,
                None => Direction::default(),
            };
            return Ok(Node::page_break().with_attr(ATTR_DIRECTION, direction.as_str()));
        }

        let mut node = Node::new(self.kind, 2);
        if let Some(lines) = self.lines {
            node.set_attr(ATTR_LINES, lines.to_string());
        }
        let numeric = [
            (ATTR_LINE_HEIGHT, self.line_height),
            (ATTR_MARGIN_TOP, self.margin_top),
            (ATTR_MARGIN_BOTTOM, self.margin_bottom),
        ];
        for (key, value) in numeric {
            if let Some(value) = value {
                node.set_attr(key, value.to_string());
            }
        }
        if !self.rows.is_empty() {
            let rows: Vec<String> = self.rows.iter().map(f32::to_string).collect();
            node.set_attr(ATTR_ROWS, rows.join(","));
        }
        Ok(node)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    page_count: usize,
    rounds: usize,
    settled: bool,
    passes: u64,
    min_height: f32,
    content_end: f32,
    breaks: Vec<BreakReport>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BreakReport {
    break_id: BreakId,
    direction: Direction,
    height: f32,
}

fn init_logger() {
    // RUST_LOG overrides, e.g. RUST_LOG=page_flow=debug
    Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let input: DocumentInput = serde_json::from_str(&std::fs::read_to_string(&cli.input)?)?;
    let options = match &cli.options {
        Some(path) => PaginationOptions::from_json(&std::fs::read_to_string(path)?)?,
        None => input.options.unwrap_or_default(),
    };

    let nodes = input
        .blocks
        .into_iter()
        .map(BlockInput::into_node)
        .collect::<Result<Vec<_>>>()?;
    let document = Document::from_nodes(nodes);
    info!("paginating {} blocks", document.len());

    let view = HeadlessView::new(&options)?;
    let mut paginator = Paginator::new(options, document, view)?;
    let pump = paginator.pump();

    let breaks = paginator
        .document()
        .markers()
        .filter_map(|(_, _, marker)| {
            let record = paginator.state().record(marker.break_id)?;
            Some(BreakReport {
                break_id: marker.break_id,
                direction: record.direction,
                height: record.height,
            })
        })
        .collect();
    let report = Report {
        page_count: paginator.page_count(),
        rounds: pump.rounds,
        settled: pump.settled,
        passes: paginator.engine().passes(),
        min_height: paginator.view().min_height(),
        content_end: paginator.view().content_end(),
        breaks,
    };

    let json = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");
    Ok(())
}

fn main() {
    init_logger();

    if let Err(e) = run(Cli::parse()) {
        error!("{e}");
        eprintln!("page-flow: {e}");
        std::process::exit(1);
    }
}
