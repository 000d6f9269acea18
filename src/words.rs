use rust_decimal::prelude::ToPrimitive;

use crate::decimal::Money;

const ONES: [&str; 10] = [
    "", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine",
];
const TEENS: [&str; 10] = [
    "Ten", "Eleven", "Twelve", "Thirteen", "Fourteen", "Fifteen", "Sixteen", "Seventeen",
    "Eighteen", "Nineteen",
];
const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

const CRORE: u128 = 10_000_000;
const LAKH: u128 = 100_000;
const THOUSAND: u128 = 1_000;

fn below_thousand(n: u128, out: &mut Vec<&'static str>) {
    let hundreds = (n / 100) as usize;
    let rest = (n % 100) as usize;
    if hundreds > 0 {
        out.push(ONES[hundreds]);
        out.push("Hundred");
    }
    match rest {
        0 => {}
        1..=9 => out.push(ONES[rest]),
        10..=19 => out.push(TEENS[rest - 10]),
        _ => {
            out.push(TENS[rest / 10]);
            if rest % 10 > 0 {
                out.push(ONES[rest % 10]);
            }
        }
    }
}

/// indian scale: crore, lakh, thousand; a crore count above 99 is itself
/// spelled on the same scale
fn indian_words(n: u128, out: &mut Vec<&'static str>) {
    let crore = n / CRORE;
    let lakh = (n % CRORE) / LAKH;
    let thousand = (n % LAKH) / THOUSAND;
    let rest = n % THOUSAND;

    if crore > 0 {
        indian_words(crore, out);
        out.push("Crore");
    }
    if lakh > 0 {
        below_thousand(lakh, out);
        out.push("Lakh");
    }
    if thousand > 0 {
        below_thousand(thousand, out);
        out.push("Thousand");
    }
    below_thousand(rest, out);
}

/// whole number in words, "Zero" for 0
pub fn number_in_words(n: u128) -> String {
    if n == 0 {
        return "Zero".to_string();
    }
    let mut out = Vec::new();
    indian_words(n, &mut out);
    out.join(" ")
}

/// "One Thousand Two Hundred Thirty Four Rupees and Fifty Paise Only"
pub fn amount_in_words(amount: Money) -> String {
    let abs = amount.abs();
    let rupees = abs.rupees().to_u128().unwrap_or_default();
    let paise = abs.paise();

    let mut words = format!("{} Rupees", number_in_words(rupees));
    if paise > 0 {
        words.push_str(" and ");
        words.push_str(&number_in_words(u128::from(paise)));
        words.push_str(" Paise");
    }
    words.push_str(" Only");

    if amount.is_negative() {
        format!("Minus {}", words)
    } else {
        words
    }
}

/// indian digit grouping with two decimals, e.g. `1,23,45,678.90`
fn group_indian(amount: Money) -> String {
    let abs = amount.abs();
    let digits = abs.rupees().to_u128().unwrap_or_default().to_string();

    let grouped = if digits.len() <= 3 {
        digits
    } else {
        let (head, tail) = digits.split_at(digits.len() - 3);
        let mut groups: Vec<&str> = Vec::new();
        let mut end = head.len();
        while end > 0 {
            let start = end.saturating_sub(2);
            groups.push(&head[start..end]);
            end = start;
        }
        groups.reverse();
        format!("{},{}", groups.join(","), tail)
    };

    format!("{}.{:02}", grouped, abs.paise())
}

/// amount with a currency symbol, e.g. `₹1,23,45,678.90`
pub fn format_currency(amount: Money, symbol: &str) -> String {
    let sign = if amount.is_negative() { "-" } else { "" };
    format!("{}{}{}", sign, symbol, group_indian(amount))
}

pub fn format_inr(amount: Money) -> String {
    format_currency(amount, "₹")
}
