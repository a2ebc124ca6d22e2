//! Template context assembly and rendering.
//!
//! The composer only wires earlier results into the variable names the
//! templates expect; every consensus-critical byte is produced upstream.
//! Rendering happens with escaping disabled since all outputs are JSON or
//! Solidity text, never HTML.

use {
    crate::compile::CompiledArtifact,
    anyhow::Context,
    handlebars::Handlebars,
    kiln_genesis::{SupplyAllocation, ValidatorRecord, supply, to_checksum},
    serde_json::{Map, Value, json},
    std::{collections::HashMap, fs, path::Path},
};

/// Scalar configuration shared by the genesis document and the generated
/// contract sources.
#[derive(Debug, Clone)]
pub struct ChainParams {
    pub chain_id: u64,
    pub first_end_block: u64,
}

/// Context for the genesis document template.
///
/// Besides the fixed variables, every compiled artifact key appears at the
/// top level, holding its runtime bytecode.
pub fn genesis_context(
    params: &ChainParams,
    validators: &[ValidatorRecord],
    allocation: &SupplyAllocation,
    extra_data: &[u8],
    artifacts: &HashMap<String, CompiledArtifact>,
) -> Value {
    let mut context = Map::new();
    context.insert("chainId".into(), json!(params.chain_id.to_string()));
    context.insert(
        "firstEndBlock".into(),
        json!(params.first_end_block.to_string()),
    );
    context.insert(
        "validators".into(),
        Value::Array(
            validators
                .iter()
                .zip(&allocation.validators)
                .map(|(validator, balance)| {
                    json!({
                        "address": to_checksum(&validator.signer),
                        "consensusAddress": to_checksum(&validator.consensus_address),
                        "balance": supply::to_hex(balance.base_units),
                        "stake": validator.stake.to_string(),
                        "storageCapacity": validator.storage_capacity,
                    })
                })
                .collect(),
        ),
    );
    context.insert("reserveBalance".into(), json!(supply::to_hex(allocation.reserve)));
    context.insert("extraData".into(), json!(format!("0x{}", hex::encode(extra_data))));
    for artifact in artifacts.values() {
        context.insert(artifact.key.clone(), json!(artifact.bytecode));
    }
    Value::Object(context)
}

/// Context for the generated validator-set contract source.
pub fn validator_set_context(params: &ChainParams, validators: &[ValidatorRecord]) -> Value {
    json!({
        "chainId": params.chain_id.to_string(),
        "firstEndBlock": params.first_end_block.to_string(),
        "validators": validators
            .iter()
            .map(|validator| {
                json!({
                    "address": to_checksum(&validator.signer),
                    "stake": validator.stake.to_string(),
                })
            })
            .collect::<Vec<_>>(),
    })
}

/// Context for the generated stake-manager contract source, which embeds
/// the validator-update payload verbatim.
pub fn stake_manager_context(update_payload: &str) -> Value {
    json!({ "validatorUpdateBytes": update_payload })
}

/// Context for the generated chain-id mixin source.
pub fn chain_id_context(params: &ChainParams) -> Value {
    json!({
        "chainId": params.chain_id.to_string(),
        "chainIdHex": chain_id_hex(params.chain_id),
    })
}

/// Uppercase hex of the chain id, left-padded to an even number of digits
/// so it can sit inside a Solidity `hex"..."` literal.
pub fn chain_id_hex(chain_id: u64) -> String {
    let digits = format!("{chain_id:X}");
    if digits.len() % 2 != 0 {
        format!("0{digits}")
    } else {
        digits
    }
}

/// Renders registered templates to output files.
pub struct Renderer {
    handlebars: Handlebars<'static>,
}

impl Renderer {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    /// Renders `template` with `context` and writes the result to `output`.
    pub fn render_file(
        &mut self,
        template: &Path,
        context: &Value,
        output: &Path,
    ) -> anyhow::Result<()> {
        let name = template.display().to_string();
        self.handlebars
            .register_template_file(&name, template)
            .with_context(|| format!("Failed to load template {name}"))?;
        let rendered = self
            .handlebars
            .render(&name, context)
            .with_context(|| format!("Failed to render template {name}"))?;
        fs::write(output, rendered)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        Ok(())
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::primitives::{Address, U256},
        kiln_genesis::supply::allocate,
        test_case::test_case,
    };

    fn params() -> ChainParams {
        ChainParams {
            chain_id: 15001,
            first_end_block: 255,
        }
    }

    fn validators() -> Vec<ValidatorRecord> {
        vec![ValidatorRecord {
            signer: Address::new(hex_literal::hex!(
                "5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"
            )),
            consensus_address: Address::with_last_byte(0x11),
            balance: U256::from(1_000u64),
            stake: U256::from(10u64),
            storage_capacity: None,
        }]
    }

    fn artifact(key: &str) -> CompiledArtifact {
        CompiledArtifact {
            key: key.to_string(),
            bytecode: "6080604052".to_string(),
            contract: "ValidatorSet".to_string(),
            source: "contracts/ValidatorSet.sol".to_string(),
        }
    }

    #[test]
    fn test_genesis_context_exposes_every_artifact_key_at_top_level() {
        let validators = validators();
        let allocation = allocate(U256::from(10_000u64), &validators).unwrap();
        let artifacts = HashMap::from([
            ("validatorSetContract".to_string(), artifact("validatorSetContract")),
            ("registryContract".to_string(), artifact("registryContract")),
        ]);

        let context = genesis_context(&params(), &validators, &allocation, &[0u8; 117], &artifacts);

        assert_eq!(context["validatorSetContract"], "6080604052");
        assert_eq!(context["registryContract"], "6080604052");
        assert_eq!(context["chainId"], "15001");
    }

    #[test]
    fn test_genesis_context_renders_checksummed_addresses_and_hex_balances() {
        let validators = validators();
        let allocation = allocate(U256::from(10_000u64), &validators).unwrap();

        let context =
            genesis_context(&params(), &validators, &allocation, &[0u8; 117], &HashMap::new());

        let entry = &context["validators"][0];
        assert_eq!(entry["address"], "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        // 1000 tokens in base units.
        assert_eq!(entry["balance"], "0x3635c9adc5dea00000");
        assert_eq!(entry["stake"], "10");
        assert_eq!(context["reserveBalance"], supply::to_hex(allocation.reserve));
        assert_eq!(context["extraData"], format!("0x{}", "00".repeat(117)));
    }

    #[test_case(15001, "3A99")]
    #[test_case(255, "FF")]
    #[test_case(4095, "0FFF")]
    #[test_case(1, "01")]
    fn test_chain_id_hex_is_uppercase_and_even_length(chain_id: u64, expected: &str) {
        let actual = chain_id_hex(chain_id);

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_renderer_substitutes_context_without_escaping() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("stake_manager.sol.hbs");
        let output = dir.path().join("StakeManager.sol");
        std::fs::write(
            &template,
            "bytes public initialValidatorSetBytes = hex\"{{validatorUpdateBytes}}\";\n",
        )
        .unwrap();

        let mut renderer = Renderer::new();
        renderer
            .render_file(&template, &stake_manager_context("f84b80"), &output)
            .unwrap();

        let rendered = std::fs::read_to_string(&output).unwrap();
        assert_eq!(
            rendered,
            "bytes public initialValidatorSetBytes = hex\"f84b80\";\n"
        );
    }

    #[test]
    fn test_renderer_iterates_validator_lists_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("validators.hbs");
        let output = dir.path().join("validators.txt");
        std::fs::write(&template, "{{#each validators}}{{this.address}};{{/each}}").unwrap();

        let mut two = validators();
        two.push(ValidatorRecord {
            signer: Address::with_last_byte(0x22),
            consensus_address: Address::with_last_byte(0x22),
            balance: U256::from(1u64),
            stake: U256::from(1u64),
            storage_capacity: None,
        });
        let mut renderer = Renderer::new();
        renderer
            .render_file(&template, &validator_set_context(&params(), &two), &output)
            .unwrap();

        let rendered = std::fs::read_to_string(&output).unwrap();
        let first = rendered.find("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        let second = rendered.find("0x0000000000000000000000000000000000000022").unwrap();
        assert!(first < second);
    }
}
