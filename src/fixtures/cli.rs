//! CLI rendering of fixture listings.

use super::Fixture;

/// Print a parsed fixture listing to stdout.
pub fn print_fixture_listing(fixtures: &[Fixture]) {
    use colored::Colorize;

    if fixtures.is_empty() {
        println!("No fixtures found.");
        return;
    }

    println!("{} fixture(s)", fixtures.len());
    println!();

    for fixture in fixtures {
        let location = format!(
            "{}:{}",
            fixture.source_file.display(),
            fixture.source_line
        );
        println!(
            "{} {} {}",
            fixture.name.green().bold(),
            "--".dimmed(),
            location.cyan()
        );
        if let Some(docstring) = &fixture.docstring {
            for line in docstring.lines() {
                println!("    {}", line.dimmed());
            }
        }
    }
}
