//! Symbol name parsing at the ingestion boundary.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing a symbol name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    /// The symbol was empty or only whitespace.
    #[error("empty symbol")]
    Empty,

    /// The symbol contains a character outside `[A-Z0-9._-]`.
    #[error("invalid character '{character}' in symbol '{symbol}'")]
    InvalidCharacter {
        /// The offending symbol.
        symbol: String,
        /// The first invalid character found.
        character: char,
    },

    /// An exchange prefix or quote suffix was present but empty.
    #[error("missing component in symbol '{0}'")]
    MissingPart(String),
}

/// A normalized symbol of the form `[EXCHANGE:]BASE[/QUOTE]`.
///
/// Parsing trims surrounding whitespace and upper-cases the name, so
/// `" binance:btc/usdt "` and `"BINANCE:BTC/USDT"` are the same symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol {
    name: String,
    exchange_len: Option<usize>,
    quote_start: Option<usize>,
}

impl Symbol {
    /// Parses and normalizes a symbol name.
    ///
    /// # Errors
    ///
    /// Returns a [`SymbolError`] if the name is empty, contains characters
    /// other than ASCII alphanumerics and `._-`, or has an empty component.
    pub fn parse(raw: &str) -> Result<Self, SymbolError> {
        let name = raw.trim().to_ascii_uppercase();
        if name.is_empty() {
            return Err(SymbolError::Empty);
        }

        let (exchange, pair) = match name.split_once(':') {
            Some((exchange, pair)) => (Some(exchange), pair),
            None => (None, name.as_str()),
        };
        let (base, quote) = match pair.split_once('/') {
            Some((base, quote)) => (base, Some(quote)),
            None => (pair, None),
        };

        let parts = exchange.into_iter().chain(Some(base)).chain(quote);
        for part in parts {
            if part.is_empty() {
                return Err(SymbolError::MissingPart(name.clone()));
            }
            if let Some(character) = part
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
            {
                return Err(SymbolError::InvalidCharacter {
                    symbol: name.clone(),
                    character,
                });
            }
        }

        let exchange_len = exchange.map(str::len);
        let quote_start = quote.map(|q| name.len() - q.len());
        Ok(Self {
            name,
            exchange_len,
            quote_start,
        })
    }

    /// Returns the normalized symbol name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Returns the exchange prefix, if any.
    #[must_use]
    pub fn exchange(&self) -> Option<&str> {
        self.exchange_len.map(|len| &self.name[..len])
    }

    /// Returns the base instrument.
    #[must_use]
    pub fn base(&self) -> &str {
        let start = self.exchange_len.map_or(0, |len| len + 1);
        let end = self.quote_start.map_or(self.name.len(), |start| start - 1);
        &self.name[start..end]
    }

    /// Returns the quote currency, if any.
    #[must_use]
    pub fn quote(&self) -> Option<&str> {
        self.quote_start.map(|start| &self.name[start..])
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for Symbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = SymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.name
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_symbol() {
        let symbol = Symbol::parse(" eurusd ").unwrap();
        assert_eq!(symbol.as_str(), "EURUSD");
        assert_eq!(symbol.exchange(), None);
        assert_eq!(symbol.base(), "EURUSD");
        assert_eq!(symbol.quote(), None);
    }

    #[test]
    fn test_full_symbol() {
        let symbol = Symbol::parse("binance:btc/usdt").unwrap();
        assert_eq!(symbol.as_str(), "BINANCE:BTC/USDT");
        assert_eq!(symbol.exchange(), Some("BINANCE"));
        assert_eq!(symbol.base(), "BTC");
        assert_eq!(symbol.quote(), Some("USDT"));
    }

    #[test]
    fn test_pair_without_exchange() {
        let symbol = Symbol::parse("EUR/USD").unwrap();
        assert_eq!(symbol.base(), "EUR");
        assert_eq!(symbol.quote(), Some("USD"));
    }

    #[test]
    fn test_rejects_malformed_symbols() {
        assert_eq!(Symbol::parse("   "), Err(SymbolError::Empty));
        assert!(matches!(
            Symbol::parse("EUR USD"),
            Err(SymbolError::InvalidCharacter { character: ' ', .. })
        ));
        assert!(matches!(
            Symbol::parse(":EURUSD"),
            Err(SymbolError::MissingPart(_))
        ));
        assert!(matches!(
            Symbol::parse("EUR/"),
            Err(SymbolError::MissingPart(_))
        ));
        assert!(matches!(
            Symbol::parse("A:B:C"),
            Err(SymbolError::InvalidCharacter { character: ':', .. })
        ));
    }
}
