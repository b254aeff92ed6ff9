use std::io::{self, BufRead, Write};

use common::{AcquisitionState, DisplayFrame, PermissionStatus};

pub fn show_status(frame: &DisplayFrame, permission: PermissionStatus, subject: &str, condition: &str) {
    let state = match frame.state {
        AcquisitionState::Idle => "Standby",
        AcquisitionState::Recording => "Recording",
    };
    println!("\n-------------------------------------------");
    println!(
        "[{}] {:>8.2} s  {:>6} samples   source: {:?}",
        state, frame.elapsed_secs, frame.sample_count, permission
    );
    println!(
        "x {:>7.2}  y {:>7.2}  z {:>7.2}  m/s^2   subject {} / cond {}",
        frame.sample.x, frame.sample.y, frame.sample.z, subject, condition
    );
}

pub fn show_menu() {
    println!("===========================================");
    println!("Select an option:");
    println!("1. Connect simulated motion source");
    println!("2. Start recording");
    println!("3. Stop recording");
    println!("4. Export CSV");
    println!("5. New recording (clear)");
    println!("6. Set subject ID / condition");
    println!("7. Timing audit");
    println!("8. Exit");
    println!("===========================================");
    print!("Choice (1-8): ");
    let _ = io::stdout().flush();
}

pub const EXIT_CHOICE: u32 = 8;

/// Reads a menu choice from stdin. Closed or unreadable input counts as Exit.
pub fn get_user_choice() -> Result<u32, std::num::ParseIntError> {
    choice_from(&mut io::stdin().lock())
}

fn choice_from<R: BufRead>(reader: &mut R) -> Result<u32, std::num::ParseIntError> {
    match read_line_from(reader) {
        Some(line) => line.parse::<u32>(),
        None => Ok(EXIT_CHOICE),
    }
}

/// Prompts for a value; an empty answer keeps `current`.
pub fn prompt(label: &str, current: &str) -> String {
    print!("{} [{}]: ", label, current);
    let _ = io::stdout().flush();
    match read_line_from(&mut io::stdin().lock()) {
        Some(input) if !input.is_empty() => input,
        _ => current.to_string(),
    }
}

/// `None` once the input is closed or fails.
fn read_line_from<R: BufRead>(reader: &mut R) -> Option<String> {
    let mut input = String::new();
    match reader.read_line(&mut input) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(input.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_choices_line_by_line() {
        let mut input = Cursor::new("2\nabc\n\n");
        assert_eq!(choice_from(&mut input), Ok(2));
        assert!(choice_from(&mut input).is_err());
        assert!(choice_from(&mut input).is_err());
    }

    #[test]
    fn closed_input_selects_exit() {
        let mut input = Cursor::new("3\n");
        assert_eq!(choice_from(&mut input), Ok(3));
        assert_eq!(choice_from(&mut input), Ok(EXIT_CHOICE));
        assert_eq!(choice_from(&mut input), Ok(EXIT_CHOICE));
    }
}
