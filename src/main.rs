use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use structopt::StructOpt;
use tracing::warn;

use codebridge::ast::Diagnostic;
use codebridge::{Engine, EngineConfig};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "codebridge",
    about = "Translate Java source to TypeScript through a rewritable code graph"
)]
struct Opt {
    /// Engine configuration file (JSON)
    #[structopt(long, parse(from_os_str), global = true)]
    config: Option<PathBuf>,

    /// Extra rule definitions appended to the built-in catalog
    #[structopt(long, parse(from_os_str), global = true)]
    rules: Option<PathBuf>,

    /// Pass cap for fixpoint transformation
    #[structopt(long, global = true)]
    max_iterations: Option<usize>,

    /// Run one rewrite pass instead of iterating to a fixpoint
    #[structopt(long, global = true)]
    single_pass: bool,

    /// Transform top-level declarations in parallel
    #[structopt(long, global = true)]
    parallel: bool,

    /// Output file
    #[structopt(short, long, parse(from_os_str), global = true)]
    output: Option<PathBuf>,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Parse Java source into an AST with diagnostics
    Parse {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
    },
    /// Build the code graph of Java source
    Graph {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
        /// Input is an AST in JSON form instead of Java source
        #[structopt(long)]
        from_ast: bool,
    },
    /// Apply the automated rules to a graph
    Transform {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
    },
    /// Apply one rule to a graph
    Apply {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
        /// Rule id, e.g. rule-5
        rule: String,
    },
    /// List the rule catalog
    Rules,
    /// Render a graph as TypeScript
    Generate {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
    },
    /// Transformation statistics of a graph
    Stats {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
    },
    /// Translate Java source to TypeScript in one go
    Convert {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
        /// Print code, diagnostics, warnings and stats as JSON
        #[structopt(long)]
        json: bool,
    },
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))
}

fn engine_config(opt: &Opt) -> Result<EngineConfig> {
    let mut config = match &opt.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {:?}", path))?,
        None => EngineConfig::default(),
    };
    if let Some(rules) = &opt.rules {
        config.rules_path = Some(rules.clone());
    }
    if let Some(max_iterations) = opt.max_iterations {
        config.max_iterations = max_iterations;
    }
    config.single_pass |= opt.single_pass;
    config.parallel |= opt.parallel;
    Ok(config)
}

fn run(opt: &Opt, engine: &Engine) -> Result<String> {
    let output = match &opt.command {
        Command::Parse { input } => engine.parse_json(&read_input(input)?)?,
        Command::Graph { input, from_ast } => {
            let text = read_input(input)?;
            if *from_ast {
                engine.ast_to_graph_json(&text)?
            } else {
                let parsed = engine.parse(&text)?;
                report_diagnostics(&parsed.diagnostics);
                engine.ast_to_graph(&parsed.ast)?.to_json()?
            }
        }
        Command::Transform { input } => engine.transform_graph_json(&read_input(input)?)?,
        Command::Apply { input, rule } => engine
            .apply_transformation_json(&read_input(input)?, rule)
            .with_context(|| format!("Failed to apply {}", rule))?,
        Command::Rules => engine.list_rules_json()?,
        Command::Generate { input } => engine.generate_code_json(&read_input(input)?)?,
        Command::Stats { input } => engine.get_stats_json(&read_input(input)?)?,
        Command::Convert { input, json } => {
            let source = read_input(input)?;
            if *json {
                engine.convert_json(&source)?
            } else {
                let conversion = engine.convert(&source)?;
                report_diagnostics(&conversion.diagnostics);
                for warning in &conversion.warnings {
                    warn!("{}", warning);
                }
                conversion.code
            }
        }
    };
    Ok(output)
}

fn report_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        warn!("{}", diagnostic);
    }
}

fn main() -> Result<()> {
    codebridge::init_tracing();
    let opt = Opt::from_args();

    let config = engine_config(&opt)?;
    let engine = Engine::from_config(config).context("Failed to initialize the engine")?;
    let output = run(&opt, &engine)?;

    // Write to file or stdout
    if let Some(output_path) = &opt.output {
        fs::write(output_path, &output)
            .with_context(|| format!("Failed to write to file: {:?}", output_path))?;
        println!("Output written to {:?}", output_path);
    } else {
        print!("{}", output);
        if !output.ends_with('\n') {
            println!();
        }
    }

    Ok(())
}

