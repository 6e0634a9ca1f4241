use anyhow::{Result, bail};

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parses seed tokens; negative values fold to their magnitude.
pub fn parse_seeds(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds = Vec::with_capacity(tokens.len());
    for token in tokens {
        if let Ok(value) = token.parse::<u64>() {
            seeds.push(value);
        } else if let Ok(value) = token.parse::<i64>() {
            seeds.push(value.unsigned_abs());
        } else {
            bail!("invalid seed '{token}'");
        }
    }
    if seeds.is_empty() {
        bail!("no seeds provided");
    }
    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_trims_and_drops_empty_entries() {
        assert_eq!(split_csv(" smoke, ,flip-rate,"), vec!["smoke", "flip-rate"]);
        assert!(split_csv("").is_empty());
    }

    #[test]
    fn parse_seeds_accepts_signed_and_unsigned() {
        let tokens = split_csv("1337,-4,18446744073709551615");
        assert_eq!(parse_seeds(&tokens).unwrap(), vec![1337, 4, u64::MAX]);
    }

    #[test]
    fn parse_seeds_rejects_garbage_and_empty_input() {
        assert!(parse_seeds(&split_csv("12,abc")).is_err());
        assert!(parse_seeds(&[]).is_err());
    }
}
