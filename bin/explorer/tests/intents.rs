//! Integration tests for prompt line parsing.

use alloy_primitives::U256;
use config::SEPOLIA_CHAIN_ID;
use explorer::intent::{Intent, IntentError};
use session::testing::addr;

#[test]
fn test_parse_address() {
    let intent: Intent = "address 0x000000000000000000000000000000000000000a"
        .parse()
        .unwrap();

    assert_eq!(intent, Intent::SetAddress(addr("0xA").into()));
}

#[test]
fn test_parse_transfer() {
    let intent: Intent = "transfer 0x000000000000000000000000000000000000000c 250"
        .parse()
        .unwrap();

    assert_eq!(
        intent,
        Intent::SubmitTransfer {
            recipient: addr("0xC"),
            amount: U256::from(250),
        }
    );
}

#[test]
fn test_parse_switch_defaults_to_sepolia() {
    assert_eq!(
        "switch".parse::<Intent>().unwrap(),
        Intent::SwitchNetwork(SEPOLIA_CHAIN_ID)
    );
    assert_eq!(
        "switch mainnet".parse::<Intent>().unwrap(),
        Intent::SwitchNetwork(1)
    );
}

#[test]
fn test_empty_line_shows_state() {
    assert_eq!("".parse::<Intent>().unwrap(), Intent::Show);
    assert_eq!("   ".parse::<Intent>().unwrap(), Intent::Show);
}

#[test]
fn test_commands_are_case_insensitive() {
    assert_eq!("MyBalance".parse::<Intent>().unwrap(), Intent::RequestOwnBalance);
    assert_eq!("QUIT".parse::<Intent>().unwrap(), Intent::Quit);
}

#[test]
fn test_rejects_malformed_input() {
    assert!(matches!(
        "address 0x1234".parse::<Intent>(),
        Err(IntentError::InvalidAddress(_))
    ));
    assert!(matches!(
        "transfer 0x000000000000000000000000000000000000000c".parse::<Intent>(),
        Err(IntentError::Usage { command: "transfer", .. })
    ));
    assert!(matches!(
        "transfer 0x000000000000000000000000000000000000000c lots".parse::<Intent>(),
        Err(IntentError::InvalidAmount(_))
    ));
    assert!(matches!(
        "switch goerli".parse::<Intent>(),
        Err(IntentError::InvalidChain(_))
    ));
    assert_eq!(
        "mint 5".parse::<Intent>(),
        Err(IntentError::UnknownCommand("mint".to_string()))
    );
}
