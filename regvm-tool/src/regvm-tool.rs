#![allow(clippy::uninlined_format_args)]

use regvm::{backends, CompileOptions, Error, Flags, Match, MatchOptions, Range, Regex};
use std::{fs, path::PathBuf};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "regvm-tool")]
struct Opt {
    /// The regular expression.
    pattern: String,

    /// The flags of the regular expression, drawn from "gimsuy".
    #[structopt(long, short, parse(from_str = Flags::from))]
    flags: Option<Flags>,

    /// Disable the bytecode optimizations.
    #[structopt(long)]
    no_opt: bool,

    /// Dump the syntax tree to stdout.
    #[structopt(long)]
    dump_ast: bool,

    /// Dump the lowered IR to stdout.
    #[structopt(long)]
    dump_ir: bool,

    /// Dump the bytecode to stdout.
    #[structopt(long)]
    dump_bytecode: bool,

    /// Abandon a search after this many backtracking steps.
    #[structopt(long)]
    budget: Option<u64>,

    /// Abandon a search nested deeper than this many lookarounds.
    #[structopt(long)]
    depth: Option<u32>,

    /// The input values to match against.
    #[structopt(conflicts_with = "file")]
    inputs: Vec<String>,

    /// Match against the contents of a specified file.
    #[structopt(long, conflicts_with = "inputs")]
    file: Option<PathBuf>,
}

fn format_group(idx: usize, group: Option<Range>, input: &str) -> String {
    match group {
        Some(r) => format!("{}: [{}, {}) {:?}", idx, r.start, r.end, &input[r.clone()]),
        None => format!("{}: unset", idx),
    }
}

fn print_match(m: &Match, input: &str) {
    for (idx, group) in m.groups().enumerate() {
        println!("{}", format_group(idx, group, input));
    }
}

fn exec_re_on_string(re: &Regex, input: &str, options: &MatchOptions) {
    let mut start = 0;
    let mut count = 0;
    loop {
        match re.try_find(input, start, options) {
            Ok(Some(m)) => {
                count += 1;
                print_match(&m, input);
                if !re.program().flags().global {
                    return;
                }
                start = if m.range().is_empty() {
                    next_char_boundary(input, m.end())
                } else {
                    m.end()
                };
                if start > input.len() {
                    return;
                }
            }
            Ok(None) => {
                if count == 0 {
                    println!("No match");
                }
                return;
            }
            Err(err) => {
                println!("{}", err);
                return;
            }
        }
    }
}

fn next_char_boundary(input: &str, pos: usize) -> usize {
    let mut next = pos + 1;
    while next < input.len() && !input.is_char_boundary(next) {
        next += 1;
    }
    next
}

fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Opt::from_args();

    let mut flags = args.flags.unwrap_or_default();
    flags.no_opt |= args.no_opt;

    let ast = backends::try_parse(&args.pattern, flags)?;
    if args.dump_ast {
        println!("AST:\n{}", ast);
    }
    let ir = backends::lower(&ast)?;
    if args.dump_ir {
        println!("IR:\n{}", ir);
    }
    let prog = backends::emit(&ir, &CompileOptions::default())?;
    if args.dump_bytecode {
        println!("Bytecode:\n{}", prog);
    }
    let re = Regex::from(prog);

    let options = MatchOptions {
        backtrack_limit: args.budget,
        depth_limit: args.depth,
    };
    if let Some(ref path) = args.file {
        match fs::read_to_string(path) {
            Ok(contents) => exec_re_on_string(&re, contents.as_str(), &options),
            Err(err) => println!("{}: {}", err, path.display()),
        };
    } else {
        for input in args.inputs {
            exec_re_on_string(&re, &input, &options);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_render_with_offsets() {
        let input = "key=value";
        let re = Regex::new("(\\w+)=(x)?").unwrap();
        let m = re.find(input).unwrap();
        let lines: Vec<String> = m
            .groups()
            .enumerate()
            .map(|(idx, group)| format_group(idx, group, input))
            .collect();
        assert_eq!(lines, vec!["0: [0, 4) \"key=\"", "1: [0, 3) \"key\"", "2: unset"]);
    }
}
