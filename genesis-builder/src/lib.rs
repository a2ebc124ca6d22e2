//! # Genesis builder
//!
//! Short-lived batch pipeline that prepares the immutable bootstrap state of
//! a Kiln proof-of-authority chain: it regenerates the templated contract
//! sources, compiles every system contract concurrently, encodes the initial
//! validator set, allocates the genesis supply and renders the final genesis
//! document. Any failure aborts the run before the genesis file is written;
//! there is no partial output.

use {
    alloy::primitives::U256,
    anyhow::Context,
    clap::Parser,
    kiln_genesis::{ValidatorRecord, header_extra_data, supply, update_payload},
    std::{fs, path::PathBuf},
};

pub use {
    address_book::AddressBook,
    compile::{CompileError, CompileJob, CompiledArtifact, Compiler, contract_jobs},
    compose::{ChainParams, Renderer},
};

pub mod address_book;
pub mod compile;
pub mod compose;

#[derive(Debug, Parser)]
#[command(version, about = "Generates the genesis document and contract sources for a Kiln chain")]
pub struct Args {
    /// Chain id of the new network.
    #[arg(short = 'c', long, default_value_t = 15001)]
    pub chain_id: u64,

    /// End block of the first validator epoch.
    #[arg(long, default_value_t = 255)]
    pub first_end_block: u64,

    /// Total genesis supply in whole tokens.
    #[arg(long, default_value_t = supply::TOTAL_SUPPLY_TOKENS.to_string())]
    pub total_supply: String,

    /// Static validator list.
    #[arg(long, default_value = "validators.json")]
    pub validators: PathBuf,

    /// Genesis document template.
    #[arg(short = 't', long, default_value = "templates/genesis.json.hbs")]
    pub template: PathBuf,

    /// Rendered genesis document.
    #[arg(short = 'o', long, default_value = "genesis.json")]
    pub output: PathBuf,

    #[arg(long, default_value = "templates/validator_set.sol.hbs")]
    pub validator_set_template: PathBuf,
    #[arg(long, default_value = "contracts/ValidatorSet.sol")]
    pub validator_set_output: PathBuf,

    #[arg(long, default_value = "templates/stake_manager.sol.hbs")]
    pub stake_manager_template: PathBuf,
    #[arg(long, default_value = "contracts/staking/StakeManager.sol")]
    pub stake_manager_output: PathBuf,

    #[arg(long, default_value = "templates/chain_id_mixin.sol.hbs")]
    pub chain_id_mixin_template: PathBuf,
    #[arg(long, default_value = "contracts/token/ChainIdMixin.sol")]
    pub chain_id_mixin_output: PathBuf,

    /// Address book seeded after a successful build.
    #[arg(long, default_value = "contractAddresses.json")]
    pub address_book: PathBuf,
    /// Template the address book is seeded from, when present.
    #[arg(long, default_value = "contractAddresses-template.json")]
    pub address_book_template: PathBuf,

    /// Compiler executable.
    #[arg(long, default_value = "solc")]
    pub solc: String,
}

pub async fn run(args: Args) -> anyhow::Result<()> {
    let validators: Vec<ValidatorRecord> = serde_json::from_str(
        &fs::read_to_string(&args.validators)
            .with_context(|| format!("Failed to read {}", args.validators.display()))?,
    )
    .with_context(|| format!("Malformed validator list {}", args.validators.display()))?;
    let total_supply = U256::from_str_radix(&args.total_supply, 10)
        .with_context(|| format!("Total supply is not a decimal amount: {}", args.total_supply))?;

    let params = ChainParams {
        chain_id: args.chain_id,
        first_end_block: args.first_end_block,
    };
    let payload = update_payload(&validators)?;
    let extra_data = header_extra_data(&validators)?;

    // The validator-set and stake-manager sources are compiler inputs, so
    // they are regenerated before the build fans out.
    println!("Generating contract sources from templates");
    let mut renderer = Renderer::new();
    renderer.render_file(
        &args.validator_set_template,
        &compose::validator_set_context(&params, &validators),
        &args.validator_set_output,
    )?;
    println!("Validator set contract updated.");
    renderer.render_file(
        &args.stake_manager_template,
        &compose::stake_manager_context(&payload),
        &args.stake_manager_output,
    )?;
    println!("Stake manager contract updated.");
    renderer.render_file(
        &args.chain_id_mixin_template,
        &compose::chain_id_context(&params),
        &args.chain_id_mixin_output,
    )?;
    println!("Chain id mixin updated.");

    // The build has no data dependency on the supply split; run it while
    // the allocation is computed and join before composing.
    let jobs = contract_jobs();
    println!("Compiling {} contracts with {}", jobs.len(), args.solc);
    let compiler = Compiler::new(&args.solc);
    let build = tokio::spawn(async move { compiler.compile_all(jobs).await });

    let allocation = supply::allocate(total_supply, &validators)?;

    let artifacts = build.await.expect("Compile orchestrator should not panic")?;
    println!("Compiled {} contracts", artifacts.len());

    // Seed the address book only once every contract compiled.
    let book = AddressBook::load(&args.address_book_template)?;
    book.save(&args.address_book)?;

    let context = compose::genesis_context(&params, &validators, &allocation, &extra_data, &artifacts);
    renderer.render_file(&args.template, &context, &args.output)?;
    println!("Genesis written to {}", args.output.display());
    Ok(())
}
