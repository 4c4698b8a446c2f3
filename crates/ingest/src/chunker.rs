/// Window settings for splitting opinion text that is too large for a single
/// evaluation call. Both values are measured in characters.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 20_000,
            overlap: 500,
        }
    }
}

pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> ChunkerConfig {
        self.config
    }

    /// Split `text` into overlapping windows of `chunk_size` characters.
    ///
    /// Text that already fits comes back as a single window. Otherwise each
    /// window starts `chunk_size - overlap` characters after the previous one,
    /// so neighbouring windows share exactly `overlap` characters. Only the
    /// last window may be shorter, and iteration stops once a window reaches
    /// the end of the text.
    pub fn chunk_text<'a>(&self, text: &'a str) -> Vec<&'a str> {
        // Byte offset of every char boundary, including the end of the text.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_len = boundaries.len() - 1;

        if char_len <= self.config.chunk_size {
            return vec![text];
        }

        let size = self.config.chunk_size.max(1);
        let step = size.saturating_sub(self.config.overlap).max(1);

        let mut chunks = Vec::with_capacity(char_len / step + 1);
        let mut start = 0;
        loop {
            let end = (start + size).min(char_len);
            chunks.push(&text[boundaries[start]..boundaries[end]]);
            if end == char_len {
                break;
            }
            start += step;
        }

        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}
