//! The `quizforge init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("quizforge.toml").exists() {
        println!("quizforge.toml already exists, skipping.");
    } else {
        std::fs::write("quizforge.toml", SAMPLE_CONFIG)?;
        println!("Created quizforge.toml");
    }

    std::fs::create_dir_all("banks")?;
    let example_path = Path::new("banks/example.toml");
    if example_path.exists() {
        println!("banks/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_BANK)?;
        println!("Created banks/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: quizforge validate --bank banks/example.toml");
    println!("  2. Run: quizforge render --bank banks/example.toml --question apples");
    println!(
        "  3. Run: quizforge grade --bank banks/example.toml --question capital \
         --answer '{{\"lot_item_id\": \"paris\"}}'"
    );

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizforge configuration

# Award partial credit for select-many and match questions.
allow_partial_grading = false
banks_dir = "./banks"
output_dir = "./quizforge-results"
"#;

const EXAMPLE_BANK: &str = r#"[bank]
id = "example"
name = "Example Bank"
description = "A small bank to get started"

[[questions]]
id = "capital"
type = "SELECT_ONE_IN_LOT"
text = "What is the capital of France?"
points = 5
correct_lot_item = { id = "paris", text = "Paris" }
incorrect_lot_items = [
    { id = "rome", text = "Rome", explanation = "Rome is the capital of Italy" },
    { id = "madrid", text = "Madrid", explanation = "Madrid is the capital of Spain" },
]

[[questions]]
id = "apples"
type = "NUMERIC_ANSWER_TYPE"
text = "<QParam>name</QParam> has <QParam>a</QParam> apples and eats <QParam>b</QParam>. How many are left?"
hint = "Compute <NumExprTex>a - b</NumExprTex>"
is_parameterized = true
points = 10
decimal_precision = 0
lower_limit = 0
upper_limit = 0
expression = "a - b"

[[questions.parameters]]
name = "name"
possible_values = ["John", "Maria"]
type = "string"

[[questions.parameters]]
name = "a"
possible_values = ["10", "12", "15"]
type = "number"

[[questions.parameters]]
name = "b"
possible_values = ["2", "3"]
type = "number"
"#;
