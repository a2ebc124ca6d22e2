//! Concurrent contract compilation.
//!
//! Every contract is compiled by an independent child process; all of them
//! are spawned up front and joined before any result is inspected, so a
//! failing sibling never cancels the others and the reported error does not
//! depend on completion order. The raw toolchain text never leaves this
//! module: callers see either a key -> artifact map or a single structured
//! error.

use {
    regex::Regex,
    std::{collections::HashMap, io},
    thiserror::Error,
    tokio::{process::Command, task::JoinSet},
};

/// Import-path remappings handed to every compiler invocation.
pub const IMPORT_REMAPPINGS: &[&str] = &[
    "@openzeppelin/=node_modules/@openzeppelin/",
    "solidity-rlp/=node_modules/solidity-rlp/",
    "/=/",
];

/// The fixed set of contracts baked into the genesis document.
pub fn contract_jobs() -> Vec<CompileJob> {
    [
        ("validatorSetContract", "contracts/ValidatorSet.sol", "ValidatorSet"),
        ("stateReceiverContract", "contracts/StateReceiver.sol", "StateReceiver"),
        ("registryContract", "contracts/common/Registry.sol", "Registry"),
        ("nativeTokenContract", "contracts/token/NativeToken.sol", "NativeToken"),
        ("storageManagerContract", "contracts/storage/StorageManager.sol", "StorageManager"),
        ("stakeManagerContract", "contracts/staking/StakeManager.sol", "StakeManager"),
        ("systemRewardContract", "contracts/staking/SystemReward.sol", "SystemReward"),
        ("slashingManagerContract", "contracts/staking/SlashingManager.sol", "SlashingManager"),
        ("stakingInfoContract", "contracts/staking/StakingInfo.sol", "StakingInfo"),
    ]
    .into_iter()
    .map(|(key, source, contract)| CompileJob::new(key, source, contract))
    .collect()
}

/// One unit of compilation work.
#[derive(Debug, Clone)]
pub struct CompileJob {
    /// Logical name the genesis template refers to.
    pub key: String,
    /// Source file handed to the compiler.
    pub source: String,
    /// Contract whose runtime bytecode is extracted.
    pub contract: String,
}

impl CompileJob {
    pub fn new(
        key: impl Into<String>,
        source: impl Into<String>,
        contract: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            source: source.into(),
            contract: contract.into(),
        }
    }
}

/// Runtime bytecode of one successfully compiled contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    pub key: String,
    /// Lowercase hex of even length, never empty.
    pub bytecode: String,
    pub contract: String,
    pub source: String,
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Failed to launch the compiler for {key}: {source}")]
    Spawn {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("Compiler exited with an error for {key}:\n{output}")]
    Toolchain { key: String, output: String },
    #[error("No runtime bytecode for {key} ({contract}) in compiler output:\n{output}")]
    MissingBytecode {
        key: String,
        contract: String,
        output: String,
    },
}

impl CompileError {
    /// Key of the job this failure belongs to.
    pub fn key(&self) -> &str {
        match self {
            Self::Spawn { key, .. }
            | Self::Toolchain { key, .. }
            | Self::MissingBytecode { key, .. } => key,
        }
    }
}

/// Drives the external compiler toolchain.
#[derive(Debug, Clone)]
pub struct Compiler {
    program: String,
    remappings: Vec<String>,
}

impl Compiler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            remappings: IMPORT_REMAPPINGS.iter().map(|r| r.to_string()).collect(),
        }
    }

    /// Compiles every job concurrently and returns the keyed artifact map.
    ///
    /// All children run to completion before results are inspected. When
    /// anything failed, the failure of the first job *in input order* is
    /// returned and no map is produced.
    pub async fn compile_all(
        &self,
        jobs: Vec<CompileJob>,
    ) -> Result<HashMap<String, CompiledArtifact>, CompileError> {
        let mut tasks = JoinSet::new();
        let mut results: Vec<Option<Result<CompiledArtifact, CompileError>>> =
            jobs.iter().map(|_| None).collect();

        for (index, job) in jobs.into_iter().enumerate() {
            let compiler = self.clone();
            tasks.spawn(async move { (index, compiler.compile_one(job).await) });
        }
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined.expect("Compile task should not panic");
            results[index] = Some(result);
        }

        let mut artifacts = HashMap::new();
        for result in results {
            let artifact = result.expect("Every job index is joined exactly once")?;
            artifacts.insert(artifact.key.clone(), artifact);
        }
        Ok(artifacts)
    }

    async fn compile_one(&self, job: CompileJob) -> Result<CompiledArtifact, CompileError> {
        let output = Command::new(&self.program)
            .arg("--bin-runtime")
            .args(&self.remappings)
            .arg(&job.source)
            .output()
            .await
            .map_err(|source| CompileError::Spawn {
                key: job.key.clone(),
                source,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(CompileError::Toolchain {
                key: job.key,
                output: combined,
            });
        }

        match extract_runtime_bytecode(&combined, &job.source, &job.contract) {
            Some(bytecode) => Ok(CompiledArtifact {
                key: job.key,
                bytecode,
                contract: job.contract,
                source: job.source,
            }),
            None => Err(CompileError::MissingBytecode {
                key: job.key,
                contract: job.contract,
                output: combined,
            }),
        }
    }
}

/// Scans combined compiler output for the runtime bytecode of one contract.
///
/// The toolchain prints a `======= <file>:<Contract> =======` marker line,
/// a `Binary of the runtime part:` label, and the hex blob on the following
/// line. Anything else, including an odd-length blob, counts as no match.
fn extract_runtime_bytecode(output: &str, source: &str, contract: &str) -> Option<String> {
    let pattern = format!(
        r"(?m)^======= {}:{} =======\r?\nBinary of the runtime part: ?\r?\n([0-9a-f]+)",
        regex::escape(source),
        regex::escape(contract),
    );
    let marker = Regex::new(&pattern).expect("Escaped marker pattern should compile");
    marker
        .captures(output)
        .map(|captures| captures[1].to_string())
        .filter(|bytecode| bytecode.len() % 2 == 0)
}
