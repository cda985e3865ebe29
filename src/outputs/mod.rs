//! Reading and writing the pipeline's on-disk formats.
//!
//! # Submodules
//!
//! - [`tsv`]: the download-stage index, one row per discovered document pair
//! - [`json`]: the extraction-stage output, one array of aligned records
//!
//! # Layout
//!
//! ```text
//! pairs.tsv                     # doc_id  ja_filename  en_filename  ja_uri  en_uri
//! html/
//! ├── meti_1a2b3c4d.en.html
//! ├── meti_1a2b3c4d.ja.html
//! └── ...
//! pairs.json                    # [{"id", "en_URI", "ja_URI", "en_body", "ja_body", "ja_date"}, ...]
//! ```

pub mod json;
pub mod tsv;
