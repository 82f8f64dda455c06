//! Loop invariant analysis demo.
//!
//! Builds a handful of small programs programmatically, analyzes each, and
//! prints the resulting invariants, assertion verdicts and warnings.

use color_eyre::Result;
use interval_analysis::{analyze, Ast, Node};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

fn main() -> Result<()> {
    color_eyre::install()?;
    TermLogger::init(LevelFilter::Debug, Config::default(), TerminalMode::Mixed, ColorChoice::Auto)?;

    println!("=== Interval Analysis Demos ===\n");

    // Example 1: bounded counter loop.
    // int i; i = 0; while (i < 10) { i = i + 1; } assert(i >= 10);
    println!("Example 1: counter loop (i = 0; while i < 10 do i = i + 1)");
    let ast = Ast::new(Node::seq(vec![
        Node::decl(["i"]),
        Node::assign("i", Node::int(0)),
        Node::while_loop(
            Node::var("i").lt(Node::int(10)),
            Node::assign("i", Node::var("i").add(Node::int(1))),
        ),
        Node::assertion(Node::var("i").ge(Node::int(10))),
    ]));
    println!("{}\n", analyze(&ast)?);

    // Example 2: branch join.
    // int x; if (x < 0) x = 0; else x = 1;
    println!("Example 2: branch join (if x < 0 then x = 0 else x = 1)");
    let ast = Ast::new(Node::seq(vec![
        Node::decl(["x"]),
        Node::if_else(
            Node::var("x").lt(Node::int(0)),
            Node::assign("x", Node::int(0)),
            Node::assign("x", Node::int(1)),
        ),
        Node::assertion(Node::var("x").le(Node::int(1))),
    ]));
    println!("{}\n", analyze(&ast)?);

    // Example 3: a division whose divisor may be zero.
    // int x, y, d; assume -1 <= d <= 1; x = 5; y = x / d;
    println!("Example 3: possible division by zero (y = x / d with d ∈ [-1, 1])");
    let ast = Ast::new(Node::seq(vec![
        Node::decl(["x", "y", "d"]),
        Node::precondition("d", -1, 1),
        Node::assign("x", Node::int(5)),
        Node::assign("y", Node::var("x").div(Node::var("d"))),
    ]));
    let report = analyze(&ast)?;
    println!("{report}\n");

    println!("Example 3 as JSON:");
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
