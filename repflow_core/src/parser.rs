//! Free-text exercise parameter parser.
//!
//! Turns strings like "3x10 @ 135lbs", "30 minutes", or
//! "3x10 @ 40/50/60kg rest 30s" into structured parameters. The grammar is
//! an explicit ordered list of matcher functions, first match wins:
//!
//! 1. Rest extraction (independent of classification, matched clause removed)
//! 2. Progressive strength: `<sets> x <reps> @ <w1>/<w2>/... <unit>`
//! 3. Strength: `<sets> x <reps> @ <weight> <unit>`
//! 4. Time: `MM:SS` or `<number> <unit>`
//! 5. Distance: `<number> <unit>`
//! 6. Sets and reps only: `<sets> x <reps>`
//! 7. Weight only: `<number> <unit>`
//!
//! Parsing is total: input matching no rule yields `ExerciseKind::Unknown`
//! with all fields absent. Unit tokens are kept as typed, never converted.

use crate::types::{ExerciseParams, ParsedExercise};
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Units accepted by the weight grammars
static WEIGHT_UNITS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "lb", "lbs", "pound", "pounds", "kg", "kgs", "kilogram", "kilograms",
    ])
});

/// Units accepted by the time grammar (bare "m" is reserved for meters)
static TIME_UNITS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "s", "sec", "secs", "second", "seconds", "min", "mins", "minute", "minutes", "h", "hr",
        "hrs", "hour", "hours",
    ])
});

/// Units accepted by the distance grammar
static DISTANCE_UNITS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "mi", "mile", "miles", "km", "kilometer", "kilometers", "m", "meter", "meters", "yd",
        "yds", "yard", "yards",
    ])
});

/// Units accepted inside a rest clause ("m" means minutes here)
static REST_UNITS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["s", "sec", "seconds", "m", "min", "minutes"]));

/// Parse one free-text parameter string
///
/// Never fails; the worst case is `Unknown` parameters with any rest period
/// that was still extractable.
pub fn parse(input: &str) -> ParsedExercise {
    let folded = input.trim().to_lowercase();
    let mut tokens = tokenize(&folded);
    let rest_period = extract_rest(&mut tokens);

    // Ordered matcher list; the order is the disambiguation rule
    let matchers: &[fn(&[Token]) -> Option<ExerciseParams>] = &[
        match_progressive_strength,
        match_strength,
        match_time,
        match_distance,
        match_sets_reps,
        match_weight_only,
    ];

    let params = matchers
        .iter()
        .find_map(|matcher| matcher(&tokens))
        .unwrap_or(ExerciseParams::Unknown);

    ParsedExercise {
        params,
        rest_period,
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
enum Token {
    /// Digit run, possibly with one decimal point ("135", "2.5")
    Number(String),
    /// Letter run ("x", "lbs", "rest")
    Word(String),
    /// Any other non-space character ('@', '/', ':')
    Symbol(char),
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() {
            let start = i;
            let mut seen_dot = false;
            while i < chars.len()
                && (chars[i].is_ascii_digit()
                    || (chars[i] == '.'
                        && !seen_dot
                        && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())))
            {
                if chars[i] == '.' {
                    seen_dot = true;
                }
                i += 1;
            }
            tokens.push(Token::Number(chars[start..i].iter().collect()));
        } else if c.is_alphabetic() {
            let start = i;
            while i < chars.len() && chars[i].is_alphabetic() {
                i += 1;
            }
            tokens.push(Token::Word(chars[start..i].iter().collect()));
        } else {
            tokens.push(Token::Symbol(c));
            i += 1;
        }
    }

    tokens
}

fn number_at(tokens: &[Token], i: usize) -> Option<&str> {
    match tokens.get(i) {
        Some(Token::Number(n)) => Some(n),
        _ => None,
    }
}

fn word_at(tokens: &[Token], i: usize) -> Option<&str> {
    match tokens.get(i) {
        Some(Token::Word(w)) => Some(w),
        _ => None,
    }
}

fn symbol_at(tokens: &[Token], i: usize, symbol: char) -> bool {
    matches!(tokens.get(i), Some(Token::Symbol(c)) if *c == symbol)
}

/// Truncating integer parse for sets/reps magnitudes
fn int_part(number: &str) -> Option<u32> {
    number.split('.').next()?.parse().ok()
}

/// Plain digit run, as required on both sides of `MM:SS`
fn is_integral(number: &str) -> bool {
    !number.is_empty() && number.chars().all(|c| c.is_ascii_digit())
}

/// `<sets> x <reps>` starting at token `i`; returns the next token index
fn sets_reps_at(tokens: &[Token], i: usize) -> Option<(u32, u32, usize)> {
    let sets = int_part(number_at(tokens, i)?)?;
    if word_at(tokens, i + 1)? != "x" {
        return None;
    }
    let reps = int_part(number_at(tokens, i + 2)?)?;
    Some((sets, reps, i + 3))
}

// ============================================================================
// Rest Extraction
// ============================================================================

/// Extract the first rest clause, removing its tokens from the stream
///
/// Patterns in priority order: `rest <N><unit>`, `<N><unit> rest`,
/// `rest MM:SS`, `MM:SS rest`. Extraction runs before classification so a
/// rest clause embedded in a strength string never disturbs the primary
/// match.
fn extract_rest(tokens: &mut Vec<Token>) -> Option<String> {
    // rest <N><unit>
    for i in 0..tokens.len() {
        if word_at(tokens, i) == Some("rest") {
            if let (Some(n), Some(unit)) = (number_at(tokens, i + 1), word_at(tokens, i + 2)) {
                if REST_UNITS.contains(unit) {
                    let rest = format!("{}{}", n, unit);
                    tokens.drain(i..i + 3);
                    return Some(rest);
                }
            }
        }
    }

    // <N><unit> rest
    for i in 0..tokens.len() {
        if let (Some(n), Some(unit)) = (number_at(tokens, i), word_at(tokens, i + 1)) {
            if REST_UNITS.contains(unit) && word_at(tokens, i + 2) == Some("rest") {
                let rest = format!("{}{}", n, unit);
                tokens.drain(i..i + 3);
                return Some(rest);
            }
        }
    }

    // rest MM:SS
    for i in 0..tokens.len() {
        if word_at(tokens, i) == Some("rest") && symbol_at(tokens, i + 2, ':') {
            if let (Some(m), Some(s)) = (number_at(tokens, i + 1), number_at(tokens, i + 3)) {
                if is_integral(m) && is_integral(s) {
                    let rest = format!("{}:{}", m, s);
                    tokens.drain(i..i + 4);
                    return Some(rest);
                }
            }
        }
    }

    // MM:SS rest
    for i in 0..tokens.len() {
        if symbol_at(tokens, i + 1, ':') && word_at(tokens, i + 3) == Some("rest") {
            if let (Some(m), Some(s)) = (number_at(tokens, i), number_at(tokens, i + 2)) {
                if is_integral(m) && is_integral(s) {
                    let rest = format!("{}:{}", m, s);
                    tokens.drain(i..i + 4);
                    return Some(rest);
                }
            }
        }
    }

    None
}

// ============================================================================
// Matchers
// ============================================================================

/// `<sets> x <reps> @ <w1>/<w2>/... <unit>` - requires at least one slash
fn match_progressive_strength(tokens: &[Token]) -> Option<ExerciseParams> {
    for i in 0..tokens.len() {
        let Some((sets, reps, at)) = sets_reps_at(tokens, i) else {
            continue;
        };
        if !symbol_at(tokens, at, '@') {
            continue;
        }

        let mut magnitudes = Vec::new();
        let mut j = at + 1;
        while let Some(n) = number_at(tokens, j) {
            magnitudes.push(n.to_string());
            j += 1;
            if symbol_at(tokens, j, '/') {
                j += 1;
            } else {
                break;
            }
        }
        // A single weight with no slash belongs to the plain strength rule
        if magnitudes.len() < 2 {
            continue;
        }

        let unit = match word_at(tokens, j) {
            Some(w) if WEIGHT_UNITS.contains(w) => w,
            _ => continue,
        };

        let weights = magnitudes
            .iter()
            .map(|magnitude| format!("{}{}", magnitude, unit))
            .collect();
        return Some(ExerciseParams::Strength {
            sets: Some(sets),
            reps: Some(reps),
            weight: None,
            progressive_weights: Some(weights),
        });
    }
    None
}

/// `<sets> x <reps> @ <weight> <unit>` - single loaded weight
fn match_strength(tokens: &[Token]) -> Option<ExerciseParams> {
    for i in 0..tokens.len() {
        let Some((sets, reps, at)) = sets_reps_at(tokens, i) else {
            continue;
        };
        if !symbol_at(tokens, at, '@') {
            continue;
        }
        let Some(magnitude) = number_at(tokens, at + 1) else {
            continue;
        };
        let unit = match word_at(tokens, at + 2) {
            Some(w) if WEIGHT_UNITS.contains(w) => w,
            _ => continue,
        };

        return Some(ExerciseParams::Strength {
            sets: Some(sets),
            reps: Some(reps),
            weight: Some(format!("{} {}", magnitude, unit)),
            progressive_weights: None,
        });
    }
    None
}

/// `MM:SS` or `<number> <time unit>`
fn match_time(tokens: &[Token]) -> Option<ExerciseParams> {
    for i in 0..tokens.len() {
        if symbol_at(tokens, i + 1, ':') {
            if let (Some(m), Some(s)) = (number_at(tokens, i), number_at(tokens, i + 2)) {
                if is_integral(m) && is_integral(s) {
                    return Some(ExerciseParams::Time {
                        time: format!("{}:{}", m, s),
                    });
                }
            }
        }
    }

    for i in 0..tokens.len() {
        if let (Some(n), Some(unit)) = (number_at(tokens, i), word_at(tokens, i + 1)) {
            if TIME_UNITS.contains(unit) {
                return Some(ExerciseParams::Time {
                    time: format!("{} {}", n, unit),
                });
            }
        }
    }

    None
}

/// `<number> <distance unit>`
fn match_distance(tokens: &[Token]) -> Option<ExerciseParams> {
    for i in 0..tokens.len() {
        if let (Some(n), Some(unit)) = (number_at(tokens, i), word_at(tokens, i + 1)) {
            if DISTANCE_UNITS.contains(unit) {
                return Some(ExerciseParams::Cardio {
                    distance: format!("{} {}", n, unit),
                });
            }
        }
    }
    None
}

/// `<sets> x <reps>` with no weight clause
fn match_sets_reps(tokens: &[Token]) -> Option<ExerciseParams> {
    for i in 0..tokens.len() {
        if let Some((sets, reps, _)) = sets_reps_at(tokens, i) {
            return Some(ExerciseParams::Strength {
                sets: Some(sets),
                reps: Some(reps),
                weight: None,
                progressive_weights: None,
            });
        }
    }
    None
}

/// `<number> <weight unit>` with no sets/reps
fn match_weight_only(tokens: &[Token]) -> Option<ExerciseParams> {
    for i in 0..tokens.len() {
        if let (Some(n), Some(unit)) = (number_at(tokens, i), word_at(tokens, i + 1)) {
            if WEIGHT_UNITS.contains(unit) {
                return Some(ExerciseParams::Strength {
                    sets: None,
                    reps: None,
                    weight: Some(format!("{} {}", n, unit)),
                    progressive_weights: None,
                });
            }
        }
    }
    None
}
