use std::rc::Rc;
use std::{env, process::ExitCode, time::Instant};

use marionette::{Compiler, MapFacts, Node, StdLogger, Value};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let file_path = if args.len() > 1 { &args[1] } else { "site.pp" };
    let node_name = if args.len() > 2 { args[2].clone() } else { "localhost".to_owned() };

    let compiler = match Compiler::from_file(file_path) {
        Ok(compiler) => compiler,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let mut facts = MapFacts::new();
    facts.insert("fqdn", Value::string(node_name.clone()));
    facts.insert(
        "hostname",
        Value::string(node_name.split('.').next().unwrap_or(&node_name).to_owned()),
    );

    let start = Instant::now();
    let mut logger = StdLogger::new();
    let catalog = match compiler.compile(Node::new(node_name.clone()), Rc::new(facts), &mut logger) {
        Ok(catalog) => catalog,
        Err(err) => {
            let elapsed = start.elapsed();
            eprintln!("error after: {elapsed:?}\n{err}");
            return ExitCode::FAILURE;
        }
    };
    let elapsed = start.elapsed();
    eprintln!("compiled in: {elapsed:?}");

    match serde_json::to_string_pretty(&catalog.to_json(&node_name)) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error writing catalog: {err}");
            ExitCode::FAILURE
        }
    }
}
