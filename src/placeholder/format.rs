// src/placeholder/format.rs
//! Brazilian display formats for values written into contracts.

use chrono::{Datelike, NaiveDate};

const MONTHS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Apply a mask where `#` stands for the next digit.
fn apply_mask(digits: &str, mask: &str) -> String {
    let mut chars = digits.chars();
    let mut out = String::with_capacity(mask.len());
    for m in mask.chars() {
        if m == '#' {
            match chars.next() {
                Some(d) => out.push(d),
                None => break,
            }
        } else {
            out.push(m);
        }
    }
    out
}

/// Format a CPF (11 digits) or CNPJ (14 digits). Other lengths are
/// returned unchanged so a typo stays visible in the document.
pub fn format_tax_id(value: &str) -> String {
    let digits = digits_only(value);
    match digits.len() {
        11 => apply_mask(&digits, "###.###.###-##"),
        14 => apply_mask(&digits, "##.###.###/####-##"),
        _ => value.to_string(),
    }
}

/// Format a landline (10 digits) or mobile (11 digits) number with area code.
pub fn format_phone(value: &str) -> String {
    let digits = digits_only(value);
    match digits.len() {
        10 => apply_mask(&digits, "(##) ####-####"),
        11 => apply_mask(&digits, "(##) #####-####"),
        _ => value.to_string(),
    }
}

/// Format a CEP as `NNNNN-NNN`.
pub fn format_zip_code(value: &str) -> String {
    let digits = digits_only(value);
    if digits.len() == 8 {
        apply_mask(&digits, "#####-###")
    } else {
        value.to_string()
    }
}

/// Format a number with `.` thousands and `,` decimal separators.
///
/// Rounds to `max_fraction` digits and trims trailing zeros down to
/// `min_fraction` digits.
pub fn format_decimal(value: f64, min_fraction: usize, max_fraction: usize) -> String {
    let factor = 10u64.pow(max_fraction as u32);
    let scaled = (value.abs() * factor as f64).round() as u64;
    let integer = scaled / factor;
    let fraction = scaled % factor;

    let mut grouped = String::new();
    let integer_digits = integer.to_string();
    for (i, c) in integer_digits.chars().enumerate() {
        if i > 0 && (integer_digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let mut fraction_digits = if max_fraction == 0 {
        String::new()
    } else {
        format!("{:0width$}", fraction, width = max_fraction)
    };
    while fraction_digits.len() > min_fraction && fraction_digits.ends_with('0') {
        fraction_digits.pop();
    }

    let sign = if value < 0.0 && scaled > 0 { "-" } else { "" };
    if fraction_digits.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{},{}", sign, grouped, fraction_digits)
    }
}

/// Format an amount in reais: `R$ 1.234,56`.
pub fn format_currency(value: f64) -> String {
    let formatted = format_decimal(value.abs(), 2, 2);
    if value < 0.0 && formatted != "0,00" {
        format!("-R$ {}", formatted)
    } else {
        format!("R$ {}", formatted)
    }
}

/// Format an area in square meters: `1.250,5 m²`.
pub fn format_area(value: f64) -> String {
    format!("{} m²", format_decimal(value, 0, 2))
}

/// `dd/mm/yyyy`
pub fn format_short_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// `18 de outubro de 2026`
pub fn format_extended_date(date: NaiveDate) -> String {
    format!(
        "{} de {} de {}",
        date.day(),
        MONTHS[date.month0() as usize],
        date.year()
    )
}
