/// Deterministic distance estimate from address text alone, used whenever
/// geocoding is unavailable. Same inputs always produce the same estimate.
///
/// Rules, in order:
///   same street, house numbers within 10  -> 0.1 mi
///   same street, house numbers within 100 -> 0.5 mi
///   same street otherwise                 -> 0.2 mi
///   same trailing city/region token       -> 2.0 mi
///   anything else                         -> 5.0 mi
pub fn fallback_distance_miles(pickup: &str, delivery: &str) -> f64 {
    let a = ParsedAddress::parse(pickup);
    let b = ParsedAddress::parse(delivery);

    if !a.street.is_empty() && a.street == b.street {
        if let (Some(na), Some(nb)) = (a.number, b.number) {
            let delta = na.abs_diff(nb);
            if delta <= 10 {
                return 0.1;
            }
            if delta <= 100 {
                return 0.5;
            }
        }
        return 0.2;
    }

    if !a.city.is_empty() && a.city == b.city {
        return 2.0;
    }

    5.0
}

#[derive(Debug, PartialEq)]
struct ParsedAddress {
    number: Option<u64>,
    street: String,
    city: String,
}

impl ParsedAddress {
    fn parse(raw: &str) -> Self {
        let normalized = normalize(raw);
        let mut segments = normalized.split(',').map(str::trim);

        let first = segments.next().unwrap_or("");
        let city = segments.last().unwrap_or("").to_string();

        let mut tokens = first.split_whitespace();
        let mut number = None;
        let mut street_tokens: Vec<&str> = Vec::new();

        if let Some(token) = tokens.next() {
            match token.parse::<u64>() {
                Ok(n) => number = Some(n),
                Err(_) => street_tokens.push(token),
            }
        }
        street_tokens.extend(tokens);

        Self {
            number,
            street: street_tokens.join(" "),
            city,
        }
    }
}

fn normalize(raw: &str) -> String {
    raw.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}
