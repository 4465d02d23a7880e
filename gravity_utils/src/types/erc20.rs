use clarity::Address as EthAddress;
use clarity::Uint256;

/// An amount of a specific ERC20 token, the representation used for
/// anything that is headed to or coming from Ethereum
#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq, Hash)]
pub struct Erc20Token {
    pub amount: Uint256,
    #[serde(rename = "contract")]
    pub token_contract_address: EthAddress,
}

impl Erc20Token {
    pub fn new(amount: Uint256, token_contract_address: EthAddress) -> Erc20Token {
        Erc20Token {
            amount,
            token_contract_address,
        }
    }
}

// First order by token address, then split ties by amount
impl PartialOrd for Erc20Token {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// First order by token address, then split ties by amount
impl Ord for Erc20Token {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self
            .token_contract_address
            .cmp(&other.token_contract_address)
        {
            std::cmp::Ordering::Equal => self.amount.cmp(&other.amount),
            ord => ord,
        }
    }
}
