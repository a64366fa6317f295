use crate::networks::Chain;

pub fn chain_parser(chain_string: &str) -> Result<Chain, String> {
    chain_string.trim().parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_parser_trims_input() {
        assert_eq!(chain_parser(" testnet "), Ok(Chain::Testnet));
        assert!(chain_parser("holesky").is_err());
    }
}
