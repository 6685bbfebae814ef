use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FileSettings {
    /// Configuration file to mount; JSON unless it ends in `.yml`/`.yaml`
    #[serde(default)]
    pub path: Option<String>,

    /// `false`: the file is read once and merged into the `default` layer.
    /// `true`: the file is mounted as a refreshing layer taking precedence
    /// over every other default layer.
    #[serde(default)]
    pub alive: bool,
}
