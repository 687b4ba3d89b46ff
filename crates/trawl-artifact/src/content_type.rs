/// Content type for a file name, from its extension.
pub fn content_type_for(name: &str) -> &'static str {
  let ext = name
    .rsplit_once('.')
    .map(|(_, ext)| ext.to_ascii_lowercase())
    .unwrap_or_default();

  match ext.as_str() {
    "html" | "htm" => "text/html",
    "md" | "markdown" => "text/markdown",
    "txt" => "text/plain",
    "csv" => "text/csv",
    "json" => "application/json",
    "yaml" | "yml" => "application/yaml",
    "pdf" => "application/pdf",
    "zip" => "application/zip",
    "png" => "image/png",
    "jpg" | "jpeg" => "image/jpeg",
    "gif" => "image/gif",
    "webp" => "image/webp",
    "bmp" => "image/bmp",
    "svg" => "image/svg+xml",
    _ => "application/octet-stream",
  }
}
