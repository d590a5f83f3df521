//! Argument parsers shared by CLI commands.

use std::str::FromStr;

/// A `NAME=URL` pair given with `--url`.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedUrl {
    pub name: String,
    pub url: String,
}

/// Parse `NAME=URL`. A bare URL is named after its last path segment.
pub fn parse_named_url(s: &str) -> Result<NamedUrl, String> {
    if let Some((name, url)) = s.split_once('=') {
        if !name.is_empty() && !name.contains('/') {
            return Ok(NamedUrl {
                name: name.to_string(),
                url: url.to_string(),
            });
        }
    }

    let path = s.split(['?', '#']).next().unwrap_or(s);
    let name = path.rsplit('/').next().unwrap_or_default();
    if name.is_empty() || !name.contains('.') {
        return Err(format!(
            "cannot derive a file name from '{}', use NAME=URL",
            s
        ));
    }
    Ok(NamedUrl {
        name: name.to_string(),
        url: s.to_string(),
    })
}

fn parse_triple<T: FromStr>(s: &str, what: &str) -> Result<[T; 3], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("{} needs three comma-separated values, got '{}'", what, s));
    }

    let parse = |p: &str| {
        p.parse::<T>()
            .map_err(|_| format!("invalid {} value '{}'", what, p))
    };
    Ok([parse(parts[0])?, parse(parts[1])?, parse(parts[2])?])
}

/// Parse `X,Y,Z` voxel dimensions.
pub fn parse_dims(s: &str) -> Result<[usize; 3], String> {
    let dims = parse_triple::<usize>(s, "dimensions")?;
    if dims.contains(&0) {
        return Err("dimensions must be positive".to_string());
    }
    Ok(dims)
}

/// Parse `SX,SY,SZ` voxel spacing.
pub fn parse_spacing(s: &str) -> Result<[f64; 3], String> {
    let spacing = parse_triple::<f64>(s, "spacing")?;
    if spacing.iter().any(|v| !v.is_finite() || *v <= 0.0) {
        return Err("spacing must be positive".to_string());
    }
    Ok(spacing)
}
