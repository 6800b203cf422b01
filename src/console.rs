//! Interactive input for the root rank.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use ringshift::{BlockSource, Error, LocalBlock, Result, SequenceSource};

/// Reads whitespace-separated integers, prompting once per element.
pub struct ConsoleSource<R, W> {
    input: R,
    prompt: W,
    pending: VecDeque<String>,
}

impl<R: BufRead, W: Write> ConsoleSource<R, W> {
    pub fn new(input: R, prompt: W) -> Self {
        ConsoleSource {
            input,
            prompt,
            pending: VecDeque::new(),
        }
    }

    fn next_token(&mut self) -> Result<String> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(token);
            }
            let mut line = String::new();
            let read = self
                .input
                .read_line(&mut line)
                .map_err(|err| Error::InvalidInput(err.to_string()))?;
            if read == 0 {
                return Err(Error::InvalidInput("unexpected end of input".into()));
            }
            self.pending
                .extend(line.split_whitespace().map(str::to_owned));
        }
    }
}

impl<R: BufRead, W: Write> BlockSource<i64> for ConsoleSource<R, W> {
    fn next_block(&mut self, rank: i32, block_len: usize) -> Result<LocalBlock<i64>> {
        let mut block = Vec::new();
        for index in 0..block_len {
            write!(self.prompt, "input p{rank} at arr[{index}]: ")
                .and_then(|()| self.prompt.flush())
                .map_err(|err| Error::InvalidInput(err.to_string()))?;
            let token = self.next_token()?;
            let value = token.parse::<i64>().map_err(|_| {
                Error::InvalidInput(format!("'{token}' is not an integer (p{rank}, arr[{index}])"))
            })?;
            block.push(value);
        }
        Ok(block)
    }
}

/// Where the root's blocks come from. Non-root ranks never produce blocks.
pub enum Input<R, W> {
    Console(ConsoleSource<R, W>),
    Sequence(SequenceSource),
    Remote,
}

impl<R: BufRead, W: Write> BlockSource<i64> for Input<R, W> {
    fn next_block(&mut self, rank: i32, block_len: usize) -> Result<LocalBlock<i64>> {
        match self {
            Input::Console(source) => source.next_block(rank, block_len),
            Input::Sequence(source) => source.next_block(rank, block_len),
            Input::Remote => Err(Error::Internal("only the root produces blocks".into())),
        }
    }
}
