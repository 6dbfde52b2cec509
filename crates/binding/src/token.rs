//! ERC20 token contract bindings.

use alloy_sol_types::sol;

sol! {
    /// The ERC20 surface the explorer reads, writes and listens to.
    #[sol(rpc)]
    interface ERC20 {
        /// Emitted on every balance movement, mints and burns included
        event Transfer(
            address indexed from,
            address indexed to,
            uint256 value
        );

        /// Get token name
        function name() external view returns (string memory);

        /// Get token symbol
        function symbol() external view returns (string memory);

        /// Get total supply
        function totalSupply() external view returns (uint256);

        /// Get token balance of an account
        function balanceOf(address account) external view returns (uint256);

        /// Transfer tokens from the caller to recipient
        function transfer(address recipient, uint256 amount) external returns (bool);
    }
}

#[cfg(test)]
mod tests {
    use super::ERC20;
    use alloy_primitives::{address, b256, Address, U256};
    use alloy_sol_types::{SolCall, SolEvent};

    #[test]
    fn test_transfer_signature() {
        assert_eq!(
            ERC20::Transfer::SIGNATURE_HASH,
            b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef")
        );
    }

    #[test]
    fn test_transfer_call_selector() {
        let call = ERC20::transferCall {
            recipient: address!("00000000000000000000000000000000000000cc"),
            amount: U256::from(5),
        };
        let encoded = call.abi_encode();
        assert_eq!(&encoded[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(encoded.len(), 4 + 32 * 2);
    }

    #[test]
    fn test_balance_of_selector() {
        let call = ERC20::balanceOfCall {
            account: Address::ZERO,
        };
        assert_eq!(&call.abi_encode()[..4], &[0x70, 0xa0, 0x82, 0x31]);
    }
}
