//! Highlight evidence sentences described by a JSON fixture.
//!
//! Runs the whole pipeline (ingest, locate, match, group, render) against an
//! in-memory page layer and prints a JSON report of the mappings, mapping
//! statistics and drawn overlays.
//!
//! Usage:
//!   cargo run --bin highlight_evidence -- fixture.json
//!   cargo run --bin highlight_evidence -- fixture.json --profile scanned --verbose
//!   cargo run --bin highlight_evidence -- fixture.json --config engine.json
//!
//! Fixture layout:
//!
//! ```json
//! {
//!   "document_id": "report",
//!   "sentences": ["First sentence.", "Second sentence."],
//!   "pages": [
//!     { "page": 1, "scale": 1.0, "origin": { "kind": "top_left" },
//!       "fragments": [{ "text": "First sentence.", "page": 1,
//!                       "bbox": { "kind": "xywh", "x": 72, "y": 90, "width": 90, "height": 12 } }] }
//!   ],
//!   "evidence": [0],
//!   "consumption": { "0": [{ "page": 1, "index": 0, "ratio": 0.9 }] }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process;

use serde::{Deserialize, Serialize};

use evidence_lens::geometry::{CoordinateSpace, Origin};
use evidence_lens::locator::SentenceLocator;
use evidence_lens::matcher::{Consumption, ConsumptionMap};
use evidence_lens::model::{
    DocumentId, EvidenceSet, FragmentId, PageMapping, PageNumber, RawFragment, SentenceId,
};
use evidence_lens::pipeline::{
    DocumentState, EngineConfig, HighlightSession, MatchProfile, SelectionOutcome,
};
use evidence_lens::render::{MemoryLayer, Overlay};
use evidence_lens::source::{InMemorySource, WordConsumptionSource};
use evidence_lens::{Error, MappingStatistics, Result};

struct CliArgs {
    fixture: PathBuf,
    config: Option<PathBuf>,
    profile: MatchProfile,
    verbose: bool,
}

impl CliArgs {
    fn from_args() -> std::result::Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let mut fixture = None;
        let mut config = None;
        let mut profile = MatchProfile::Default;
        let mut verbose = false;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--config" => {
                    i += 1;
                    let path = args.get(i).ok_or("--config needs a path")?;
                    config = Some(PathBuf::from(path));
                },
                "--profile" => {
                    i += 1;
                    let name = args.get(i).ok_or("--profile needs a name")?;
                    profile = MatchProfile::from_name(name)
                        .ok_or_else(|| format!("unknown profile '{}'", name))?;
                },
                "--verbose" | "-v" => {
                    verbose = true;
                },
                other if other.starts_with('-') => {
                    return Err(format!("unknown option '{}'", other));
                },
                other => {
                    fixture = Some(PathBuf::from(other));
                },
            }
            i += 1;
        }

        Ok(Self {
            fixture: fixture.ok_or("missing fixture path")?,
            config,
            profile,
            verbose,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Fixture {
    #[serde(default = "default_document_id")]
    document_id: String,
    sentences: Vec<String>,
    #[serde(default)]
    pages: Vec<PageFixture>,
    #[serde(default)]
    evidence: Vec<SentenceId>,
    #[serde(default)]
    consumption: BTreeMap<SentenceId, Vec<ConsumptionEntry>>,
}

fn default_document_id() -> String {
    "fixture".to_string()
}

#[derive(Debug, Deserialize)]
struct PageFixture {
    page: PageNumber,
    #[serde(default = "default_scale")]
    scale: f32,
    #[serde(default)]
    origin: Origin,
    fragments: Vec<RawFragment>,
}

fn default_scale() -> f32 {
    1.0
}

/// `index` is the fragment's position in the page's reading order after
/// ingestion (`0..n`), not the raw renderer index.
#[derive(Debug, Deserialize)]
struct ConsumptionEntry {
    page: PageNumber,
    index: usize,
    ratio: f32,
    #[serde(default)]
    matched_words: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Report {
    document_id: String,
    state_version: u64,
    mappings: Vec<PageMapping>,
    statistics: MappingStatistics,
    selection: SelectionReport,
}

#[derive(Debug, Serialize)]
struct SelectionReport {
    evidence: Vec<SentenceId>,
    page: Option<PageNumber>,
    outcome: String,
    overlays: Vec<Overlay>,
}

fn load_config(args: &CliArgs) -> Result<EngineConfig> {
    match &args.config {
        Some(path) => EngineConfig::from_path(path),
        None => Ok(args.profile.create_config()),
    }
}

fn build_source(fixture: &Fixture, document_id: &DocumentId) -> InMemorySource {
    let mut source =
        InMemorySource::new().with_document(document_id.clone(), fixture.sentences.clone());
    for page in &fixture.pages {
        source = source.with_page(page.page, page.fragments.clone());
    }
    for (sentence_id, entries) in &fixture.consumption {
        let map: ConsumptionMap = entries
            .iter()
            .map(|e| {
                (
                    FragmentId::new(e.page, e.index),
                    Consumption::new(e.ratio, e.matched_words.clone()),
                )
            })
            .collect();
        source = source.with_consumption(*sentence_id, map);
    }
    source
}

fn run(args: &CliArgs) -> Result<Report> {
    let config = load_config(args)?;
    let json = std::fs::read_to_string(&args.fixture)?;
    let fixture: Fixture = serde_json::from_str(&json)?;
    if fixture.sentences.is_empty() {
        return Err(Error::Source("fixture has no sentences".to_string()));
    }

    let document_id = DocumentId::new(fixture.document_id.clone());
    let source = build_source(&fixture, &document_id);

    let mut state = DocumentState::empty().load_from(&source, document_id.clone());
    for page in &fixture.pages {
        let space = CoordinateSpace {
            origin: page.origin,
            scale: page.scale,
        };
        state = state.ingest_from(&source, &[page.page], &space);
    }
    let state = state.relocate(&SentenceLocator::new(config.locator.clone()));

    let evidence = EvidenceSet::new(fixture.evidence.clone());
    let mut session = HighlightSession::new(&config);
    let mut layer = MemoryLayer::new();

    // Display the target page at the scale it was captured at
    let target_scale = evidence
        .sentence_ids
        .iter()
        .find_map(|id| state.page_for(*id))
        .and_then(|page| state.pages().get_page(page))
        .map(|cached| cached.scale);
    if let Some(scale) = target_scale {
        session.scale_changed(scale, &mut layer);
    }

    let ticket = session.begin_selection(&evidence, &state, &mut layer);
    log::debug!("Waiting {:?} for the page to settle", session.settle_delay());
    let outcome = session.complete(
        &ticket,
        &state,
        Some(&source as &dyn WordConsumptionSource),
        &mut layer,
    );
    let outcome = match outcome {
        SelectionOutcome::Rendered(handles) => format!("rendered {} overlays", handles.len()),
        SelectionOutcome::Empty(reason) => format!("empty: {:?}", reason),
        SelectionOutcome::Stale => "stale".to_string(),
    };

    Ok(Report {
        document_id: document_id.to_string(),
        state_version: state.version(),
        mappings: state.mappings().to_vec(),
        statistics: state.statistics(),
        selection: SelectionReport {
            evidence: evidence.sentence_ids,
            page: ticket.page,
            outcome,
            overlays: layer.overlays().cloned().collect(),
        },
    })
}

fn main() {
    let args = match CliArgs::from_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("Error: {}", message);
            eprintln!(
                "Usage: highlight_evidence <fixture.json> [--config <engine.json>] [--profile <name>] [--verbose]"
            );
            process::exit(2);
        },
    };

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&args).and_then(|report| Ok(serde_json::to_string_pretty(&report)?)) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        },
    }
}
