use rustc_hash::FxHashMap;

use crate::config::TokenSettings;
use crate::db::Token;

/// Static token reference data with address and symbol lookups.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: Vec<Token>,
    by_address: FxHashMap<String, usize>,
    by_symbol: FxHashMap<String, usize>,
}

impl TokenRegistry {
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut by_address = FxHashMap::default();
        let mut by_symbol = FxHashMap::default();
        for (idx, token) in tokens.iter().enumerate() {
            by_address.entry(token.id.clone()).or_insert(idx);
            by_symbol.entry(token.symbol.to_uppercase()).or_insert(idx);
        }

        Self {
            tokens,
            by_address,
            by_symbol,
        }
    }

    pub fn from_settings(settings: &[TokenSettings]) -> Self {
        Self::new(settings.iter().map(Token::from).collect())
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn get(&self, address: &str) -> Option<&Token> {
        self.by_address
            .get(&address.to_lowercase())
            .map(|&idx| &self.tokens[idx])
    }

    pub fn symbol_of(&self, address: &str) -> Option<&str> {
        self.get(address).map(|t| t.symbol.as_str())
    }

    /// Symbol lookup is case-insensitive.
    pub fn address_of(&self, symbol: &str) -> Option<&str> {
        self.by_symbol
            .get(&symbol.to_uppercase())
            .map(|&idx| self.tokens[idx].id.as_str())
    }

    /// Address for a caller-supplied identifier, which may be a known symbol
    /// or an address. Unknown identifiers are returned lowercased.
    pub fn resolve(&self, identifier: &str) -> String {
        let identifier = identifier.trim();
        if self.get(identifier).is_some() {
            return identifier.to_lowercase();
        }
        match self.address_of(identifier) {
            Some(address) => address.to_string(),
            None => identifier.to_lowercase(),
        }
    }

    /// Symbol when known, otherwise the address itself.
    pub fn label<'a>(&'a self, address: &'a str) -> &'a str {
        self.symbol_of(address).unwrap_or(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
    const WETH: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";

    fn registry() -> TokenRegistry {
        TokenRegistry::new(vec![Token::new(USDC, "USDC", 6), Token::new(WETH, "WETH", 18)])
    }

    #[test]
    fn test_lookups() {
        let registry = registry();
        assert_eq!(registry.symbol_of(&USDC.to_uppercase()), Some("USDC"));
        assert_eq!(registry.address_of("weth"), Some(WETH));
        assert_eq!(registry.get(WETH).map(|t| t.decimals), Some(18));
        assert!(registry.get("0xdead").is_none());
    }

    #[test]
    fn test_resolve_symbols_and_addresses() {
        let registry = registry();
        assert_eq!(registry.resolve("USDC"), USDC);
        assert_eq!(registry.resolve(" WETH "), WETH);
        assert_eq!(registry.resolve(&WETH.to_uppercase()), WETH);
        assert_eq!(registry.resolve("0xBEEF"), "0xbeef");
    }

    #[test]
    fn test_label_falls_back_to_address() {
        let registry = registry();
        assert_eq!(registry.label(USDC), "USDC");
        assert_eq!(registry.label("0xbeef"), "0xbeef");
    }
}
