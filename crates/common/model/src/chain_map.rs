use serde::{Deserialize, Serialize};
use tracing::debug;

/// Declares that a Mainnet producer also operates `testnet_producer` on Testnet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainMapping {
    pub mainnet_producer: String,
    pub testnet_producer: String,
}

/// Parses the published producer chain map, a two-column markdown table:
///
/// ```text
/// | Mainnet      | Testnet      |
/// |--------------|--------------|
/// | bp1          | bp1testnet   |
/// ```
///
/// The header and separator rows are skipped. Rows that are not table rows or that leave one
/// of the two cells empty are ignored.
pub fn parse_chain_map(markdown: &str) -> Vec<ChainMapping> {
    let mut mappings = vec![];
    for line in markdown.lines().skip(2) {
        let line = line.trim();
        let Some(row) = line
            .strip_prefix('|')
            .and_then(|line| line.strip_suffix('|'))
        else {
            continue;
        };

        let mut cells = row.split('|').map(str::trim);
        match (cells.next(), cells.next()) {
            (Some(mainnet), Some(testnet)) if !mainnet.is_empty() && !testnet.is_empty() => {
                mappings.push(ChainMapping {
                    mainnet_producer: mainnet.to_string(),
                    testnet_producer: testnet.to_string(),
                })
            }
            _ => debug!(row = line, "Skipping chain map row"),
        }
    }
    mappings
}
