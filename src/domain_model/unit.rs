use serde::Deserialize;

pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Offset pagination window. Out-of-range values fall back to the defaults
/// instead of failing the request.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => l,
            _ => DEFAULT_PAGE_LIMIT,
        };
        Page {
            limit,
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_limit_falls_back_to_default() {
        assert_eq!(Page::new(Some(0), Some(5)), Page { limit: 10, offset: 5 });
        assert_eq!(Page::new(None, None), Page { limit: 10, offset: 0 });
        assert_eq!(Page::new(Some(3), None), Page { limit: 3, offset: 0 });
    }
}
