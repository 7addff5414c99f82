//! The `coursekit init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("coursekit.toml").exists() {
        println!("coursekit.toml already exists, skipping.");
    } else {
        std::fs::write("coursekit.toml", SAMPLE_CONFIG)?;
        println!("Created coursekit.toml");
    }

    std::fs::create_dir_all("exams")?;
    let example_path = Path::new("exams/example.toml");
    if example_path.exists() {
        println!("exams/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_EXAM)?;
        println!("Created exams/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit coursekit.toml with your portal's API URL");
    println!("  2. Run: coursekit login --email you@example.com");
    println!("  3. Run: coursekit validate --exam exams/example.toml");
    println!("  4. Run: coursekit exam publish --file exams/example.toml");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# coursekit configuration

output_dir = "./coursekit-reports"

[backend]
api_url = "http://localhost:3000"
# token = "${COURSEKIT_TOKEN}"
# timeout_secs = 30
"#;

const EXAMPLE_EXAM: &str = r#"# Remove `id` to create a new exam; keep it to update an existing one.
[exam]
course_id = 1
min_score = 6.0

[[questions]]
text = "Qual EPI protege contra ruído?"
alternatives = ["Luva de raspa", "Protetor auricular", "Capacete"]
correct = 1

[[questions]]
text = "Qual a cor do extintor de CO2?"
alternatives = ["Vermelho", "Azul", "Amarelo"]
correct = 0
"#;
