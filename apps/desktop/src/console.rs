//! Prints render instructions to stdout.

use client_core::{
    render::{CollegeRow, RecommendationView},
    Panel, RenderInstruction, Surface,
};

pub fn print_all(instructions: &[RenderInstruction]) {
    for instruction in instructions {
        print_one(instruction);
    }
}

fn print_one(instruction: &RenderInstruction) {
    match instruction {
        RenderInstruction::Show(panel) => tracing::debug!(panel = panel_name(*panel), "show"),
        RenderInstruction::Hide(panel) => tracing::debug!(panel = panel_name(*panel), "hide"),
        RenderInstruction::Message { text, .. } if text.is_empty() => {}
        RenderInstruction::Message { surface, text } => {
            println!("[{}] {text}", surface_name(*surface));
        }
        RenderInstruction::TestForm {
            title, questions, ..
        } => {
            println!("\n== {title} ==");
            for question in questions {
                println!("{}", question.prompt);
                for option in &question.options {
                    println!("    {}", option.label);
                }
            }
        }
        RenderInstruction::Recommendations(view) => print_recommendations(view),
        RenderInstruction::Resources(resources) => {
            println!("\n== Free Resources ==");
            if resources.is_empty() {
                println!("(none)");
            }
            for resource in resources {
                println!("- {} <{}>", resource.title, resource.url);
            }
        }
        RenderInstruction::Colleges(rows) => {
            println!("\n== Matching Colleges ==");
            if rows.is_empty() {
                println!("(none)");
            }
            for row in rows {
                print_college(row);
            }
        }
        RenderInstruction::CollegeDetail(row) => {
            println!("\n== College ==");
            print_college(row);
        }
    }
}

fn print_recommendations(view: &RecommendationView) {
    println!("\n== Recommendations ==");
    println!("{}", view.summary);
    println!("{:<48} Fit", "Course");
    for course in &view.courses {
        println!("{:<48} {}", course.label, course.fit);
    }
}

fn print_college(row: &CollegeRow) {
    println!(
        "- {} ({}, {}) {} | fees/year: {} | scholarships: {} | placements: {}",
        row.name,
        row.city,
        row.country,
        row.ownership,
        row.fees_per_year,
        row.scholarships,
        row.placements
    );
    if let Some(website) = &row.website {
        println!("  {website}");
    }
}

fn panel_name(panel: Panel) -> &'static str {
    match panel {
        Panel::Auth => "auth",
        Panel::Form => "form",
        Panel::Test => "test",
        Panel::Results => "results",
    }
}

fn surface_name(surface: Surface) -> &'static str {
    match surface {
        Surface::Auth => "auth",
        Surface::Form => "form",
        Surface::Test => "test",
    }
}
