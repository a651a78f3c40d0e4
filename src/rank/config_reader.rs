use crate::rank::*;

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputSettings {
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    pub provider: Option<String>,
    #[serde(rename = "sourceLanguage")]
    pub source_language: Option<String>,
    #[serde(rename = "targetLanguage")]
    pub target_language: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesSettings {
    #[serde(rename = "tiebreakMode")]
    pub tiebreak_mode: Option<String>,
    #[serde(rename = "randomSeed")]
    pub random_seed: Option<String>,
    #[serde(rename = "maxCandidates")]
    pub max_candidates: Option<usize>,
    #[serde(rename = "itemTimeoutMs")]
    pub item_timeout_ms: Option<u64>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankConfig {
    #[serde(default)]
    pub input: InputSettings,
    #[serde(default)]
    pub rules: RulesSettings,
    pub workers: Option<usize>,
    #[serde(rename = "outputFile")]
    pub output_file: Option<String>,
}

/// Reads a configuration file. Relative paths inside the file are resolved
/// against the directory of the file.
pub fn read_config(path: &str) -> RankResult<RankConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu {
        path: path.to_string(),
    })?;
    debug!("read config: {:?}", contents);
    let mut config: RankConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;

    let root_p = Path::new(path).parent().context(MissingParentDirSnafu {})?;
    config.input.file_path = config.input.file_path.map(|p| resolve(root_p, &p));
    config.output_file = config.output_file.map(|p| resolve(root_p, &p));
    Ok(config)
}

fn resolve(root: &Path, p: &str) -> String {
    if p == "-" || p == "stdout" || Path::new(p).is_absolute() {
        p.to_string()
    } else {
        let full: PathBuf = [root, Path::new(p)].iter().collect();
        full.as_path().display().to_string()
    }
}
