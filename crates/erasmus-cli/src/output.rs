use std::io::Write;

use erasmus_core::{DestinationCandidate, ExamsAnalysis, ProgramSummary};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print the step 1 program summary.
pub fn print_program(
    w: &mut dyn Write,
    program: &ProgramSummary,
    color: ColorMode,
) -> std::io::Result<()> {
    if !program.has_program {
        if color.enabled() {
            writeln!(w, "{}", "No Erasmus call found".yellow())?;
        } else {
            writeln!(w, "No Erasmus call found")?;
        }
        if let Some(summary) = &program.summary {
            writeln!(w, "{summary}")?;
        }
        return Ok(());
    }

    if color.enabled() {
        writeln!(w, "{}", "Erasmus call summary".green().bold())?;
    } else {
        writeln!(w, "Erasmus call summary")?;
    }
    writeln!(w)?;
    if let Some(summary) = &program.summary {
        writeln!(w, "{summary}")?;
    }
    writeln!(w)?;
    if let Some(url) = &program.call_pdf_url {
        writeln!(w, "Call PDF: {url}")?;
    }
    Ok(())
}

/// Print the department list, numbered.
pub fn print_departments(
    w: &mut dyn Write,
    departments: &[String],
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(
            w,
            "{}",
            format!("{} departments found", departments.len()).green()
        )?;
    } else {
        writeln!(w, "{} departments found", departments.len())?;
    }
    for (i, department) in departments.iter().enumerate() {
        writeln!(w, "  {}. {}", i + 1, department)?;
    }
    Ok(())
}

/// Print destination candidates, one block per institution.
pub fn print_destinations(
    w: &mut dyn Write,
    destinations: &[DestinationCandidate],
    color: ColorMode,
) -> std::io::Result<()> {
    if destinations.is_empty() {
        writeln!(w, "No destinations found for this department and period.")?;
        return Ok(());
    }

    if color.enabled() {
        writeln!(
            w,
            "{}",
            format!("{} destinations found", destinations.len())
                .green()
                .bold()
        )?;
    } else {
        writeln!(w, "{} destinations found", destinations.len())?;
    }

    for destination in destinations {
        writeln!(w)?;
        if color.enabled() {
            writeln!(w, "{}", destination.name.bold())?;
        } else {
            writeln!(w, "{}", destination.name)?;
        }
        if let Some(code) = &destination.codice_europeo {
            writeln!(w, "  code: {code}")?;
        }
        if let Some(seats) = &destination.posti {
            let duration = destination.durata_per_posto.as_deref().unwrap_or("?");
            writeln!(w, "  seats: {seats} ({duration} months each)")?;
        }
        if let Some(level) = &destination.livello {
            writeln!(w, "  level: {level}")?;
        }
        if let Some(language) = &destination.requisiti_linguistici
            && !language.is_empty()
        {
            writeln!(w, "  language: {language}")?;
        }
        if !destination.description.is_empty() {
            if color.enabled() {
                writeln!(w, "  {}", destination.description.dimmed())?;
            } else {
                writeln!(w, "  {}", destination.description)?;
            }
        }
    }
    Ok(())
}

/// Print the exam compatibility analysis.
pub fn print_analysis(
    w: &mut dyn Write,
    analysis: &ExamsAnalysis,
    color: ColorMode,
) -> std::io::Result<()> {
    let score = format!("Compatibility score: {:.1}/100", analysis.compatibility_score);
    if color.enabled() {
        if analysis.compatibility_score >= 60.0 {
            writeln!(w, "{}", score.green().bold())?;
        } else if analysis.compatibility_score > 0.0 {
            writeln!(w, "{}", score.yellow().bold())?;
        } else {
            writeln!(w, "{}", score.red().bold())?;
        }
    } else {
        writeln!(w, "{score}")?;
    }

    writeln!(w)?;
    writeln!(w, "{}", analysis.analysis_summary)?;

    if !analysis.matched_exams.is_empty() {
        writeln!(w)?;
        writeln!(w, "Matched exams:")?;
        for exam in &analysis.matched_exams {
            writeln!(
                w,
                "  {} -> {} [{}] ({} / {})",
                exam.student_exam,
                exam.destination_course,
                exam.compatibility,
                exam.credits_student,
                exam.credits_destination,
            )?;
            if let Some(notes) = &exam.notes {
                writeln!(w, "    {notes}")?;
            }
        }
    }

    if !analysis.suggested_exams.is_empty() {
        writeln!(w)?;
        writeln!(w, "Suggested exams:")?;
        for exam in &analysis.suggested_exams {
            writeln!(w, "  {} ({}): {}", exam.course_name, exam.credits, exam.reason)?;
        }
    }

    writeln!(w)?;
    writeln!(w, "Course catalog PDF: {}", analysis.exams_pdf_url)?;
    Ok(())
}
