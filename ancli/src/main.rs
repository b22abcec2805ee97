use std::{path::PathBuf, process::ExitCode, sync::Arc};

use ancore::prelude::*;
use anexpr::{lexer::normalize_operators, prelude::*};
use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand};
use log::debug;
use parking_lot::Mutex;

#[derive(Parser, Debug)]
#[command(author, version, about = "Annunciator light expression tools")]
struct Cli {
    /// Verbose mode (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the expression driving every light of a profile
    Check {
        /// Profile files, earlier ones take precedence
        #[arg(required = true)]
        profiles: Vec<PathBuf>,

        /// Aircraft whose section applies
        #[arg(short, long, default_value = "")]
        aircraft: String,

        /// Only show these lights
        #[arg(short, long = "light")]
        lights: Vec<String>,
    },

    /// Evaluate an expression against hand-set variable values
    Eval {
        expression: String,

        /// Variable value, e.g. `--set "A:GEAR HANDLE POSITION, bool=1"` or `--set L:VAR=ON`
        #[arg(short, long = "set", value_name = "VAR=VALUE")]
        values: Vec<String>,
    },
}

fn telemetry_parser() -> (Arc<TelemetryConnection<ManualSource>>, ExpressionParser) {
    let telemetry = Arc::new(TelemetryConnection::new(ManualSource));
    let mut connections = Connections::new();
    for dialect in [
        Dialect::Local,
        Dialect::Simulator,
        Dialect::Offset,
        Dialect::Bus,
    ] {
        connections.insert(dialect, telemetry.clone());
    }
    (telemetry, ExpressionParser::new(connections))
}

/// Prints a parse error as a report pointing into the text it came from.
fn report(origin: &str, text: &str, error: &ExprError) {
    let Some(range) = error.span() else {
        eprintln!("{origin}: {error}");
        return;
    };

    let mut colors = ColorGenerator::new();
    let span = (origin.to_string(), range);
    let printed = Report::build(ReportKind::Error, span.clone())
        .with_message(error.to_string())
        .with_label(
            Label::new(span)
                .with_message("The error occurred here")
                .with_color(colors.next()),
        )
        .finish()
        .eprint((origin.to_string(), Source::from(normalize_operators(text))));
    if let Err(io) = printed {
        debug!("cannot render report: {io}");
        eprintln!("{origin}: {error}");
    }
}

fn check(profiles: &[PathBuf], aircraft: &str, filter: &[String]) -> Result<bool, String> {
    let filter = filter
        .iter()
        .map(|name| Light::parse(name))
        .collect::<AnResult<Vec<_>>>()
        .map_err(|e| e.to_string())?;

    let mut chain = ProfileChain::new();
    for path in profiles {
        chain.push(Profile::load(path).map_err(|e| e.to_string())?);
    }

    let (_, parser) = telemetry_parser();
    let mut healthy = true;
    for light in light_expressions(&chain, aircraft, &parser) {
        let wanted = filter.is_empty()
            || Light::parse(light.name()).is_ok_and(|light| filter.contains(&light));
        if !wanted {
            continue;
        }

        match light.error_text() {
            Some(error) => {
                healthy = false;
                println!("{:<16} ERROR {error}", light.name());
                if let Ok(kind) = Light::parse(light.name()) {
                    let text = light_expression_text(&chain, aircraft, kind);
                    if let Err(error) = parser.try_parse(&text) {
                        report(light.name(), &text, &error);
                    }
                }
            }
            None => println!("{:<16} {light}", light.name()),
        }
        for variable in light.variables() {
            println!("{:<16}   uses {variable}", "");
        }
    }
    Ok(healthy)
}

fn parse_assignment(parser: &ExpressionParser, text: &str) -> Result<(Variable, Value), String> {
    let (name, value) = text
        .rsplit_once('=')
        .ok_or_else(|| format!("expected VAR=VALUE, got '{text}'"))?;
    let node = parser
        .try_parse(name.trim())
        .map_err(|e| format!("'{name}': {e}"))?;
    let variable = node
        .variable()
        .cloned()
        .ok_or_else(|| format!("'{name}' is not a variable"))?;

    let value = match value.trim() {
        "ON" | "true" => Value::Boolean(true),
        "OFF" | "false" => Value::Boolean(false),
        number => number
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| format!("'{number}' is neither ON, OFF nor a number"))?,
    };
    Ok((variable, value))
}

fn eval(expression: &str, assignments: &[String]) -> Result<bool, String> {
    let (telemetry, parser) = telemetry_parser();
    let values = assignments
        .iter()
        .map(|text| parse_assignment(&parser, text))
        .collect::<Result<Vec<_>, _>>()?;

    let root = match parser.try_parse(expression) {
        Ok(root) => root,
        Err(error) => {
            report("expression", expression, &error);
            return Ok(false);
        }
    };
    let optimized = optimize(root.clone());
    println!("expression: {root}");
    if !Arc::ptr_eq(&root, &optimized) {
        println!("optimized:  {optimized}");
    }

    let last = Arc::new(Mutex::new(None));
    let sink = last.clone();
    let handle = listener(move |value| *sink.lock() = Some(value.clone()));
    optimized.subscribe(handle.clone());

    telemetry.set_connected(true);
    for (variable, value) in values {
        debug!("{variable} = {value}");
        telemetry.publish(&variable, value);
    }

    let result = last.lock().clone();
    optimized.unsubscribe(&handle);
    match result {
        Some(value) => {
            println!("value:      {value}");
            Ok(value.as_error().is_none())
        }
        None => {
            println!("value:      (none)");
            Ok(false)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let outcome = match &cli.command {
        Commands::Check {
            profiles,
            aircraft,
            lights,
        } => check(profiles, aircraft, lights),
        Commands::Eval {
            expression,
            values,
        } => eval(expression, values),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::from(2)
        }
    }
}
