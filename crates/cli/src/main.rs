use clap::Parser;
use sasm_analyses::analyze_object;
use sasm_data::Dialect;
use sasm_interp::{CallOutcome, Interpreter};
use sasm_parser::{highlight_span, parse_program};
use sasm_translator::translate_object;
use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
    process::ExitCode,
};

#[derive(Parser)]
#[command(name = "sasm")]
#[command(about = "EVM-dialect to wasm-dialect structured assembly translator", long_about = None)]
#[command(version)]
struct Cli {
    /// Input file (use '-' or omit for stdin)
    input: Option<PathBuf>,

    /// Run the translated program's main function and report the outcome
    #[arg(long)]
    run: bool,

    /// Hex-encoded calldata for --run
    #[arg(long, default_value = "")]
    calldata: String,
}

fn read_input(input: Option<PathBuf>) -> String {
    let use_stdin = match &input {
        None => true,
        Some(path) => path.to_str() == Some("-"),
    };

    if use_stdin {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).expect("failed to read from stdin");
        buffer
    } else {
        let path = input.unwrap();
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read file '{}': {}", path.display(), e))
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .init();

    let cli = Cli::parse();
    let source = read_input(cli.input);

    let object = match parse_program(&source) {
        Ok(object) => object,
        Err(err) => {
            let mut out = String::new();
            highlight_span(&mut out, &source, err.span.clone(), 2);
            eprintln!("parse error: {err}\n{out}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(diagnostics) = analyze_object(&Dialect::evm256(), &object) {
        eprintln!("input does not analyze under the evm dialect:\n{diagnostics}");
        return ExitCode::FAILURE;
    }

    let translated = match translate_object(&object) {
        Ok(translated) => translated,
        Err(err) => {
            eprintln!("translation failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    print!("{translated}");

    if cli.run {
        let mut interp = Interpreter::new(&translated.code);
        interp.state.calldata = match alloy_primitives::hex::decode(&cli.calldata) {
            Ok(bytes) => bytes,
            Err(err) => {
                eprintln!("invalid --calldata: {err}");
                return ExitCode::FAILURE;
            }
        };
        match interp.run_main() {
            Ok(CallOutcome::Values(_)) => eprintln!("ran to completion"),
            Ok(CallOutcome::Finished(data)) => {
                eprintln!("finished with 0x{}", alloy_primitives::hex::encode(data))
            }
            Ok(CallOutcome::Reverted(data)) => {
                eprintln!("reverted with 0x{}", alloy_primitives::hex::encode(data))
            }
            Err(err) => {
                eprintln!("trapped: {err}");
                return ExitCode::FAILURE;
            }
        }
        for (key, value) in &interp.state.storage {
            eprintln!("storage[{key}] = {value}");
        }
    }

    ExitCode::SUCCESS
}
