//! In-process transport with one thread per rank.

use std::any::Any;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use log::trace;

use super::{check_block_count, check_scatter_input, Message, Transport};
use crate::constants::{DEFAULT_RECV_DEADLINE, ROOT};
use crate::error::SortError;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Tag {
    Barrier,
    Broadcast,
    Scatter,
    Gather,
    AllGather,
    AllToAll,
}

struct Envelope {
    tag: Tag,
    payload: Box<dyn Any + Send>,
}

/// A group of local workers connected by one channel per ordered pair of ranks.
#[derive(Copy, Clone, Debug)]
pub struct LocalGroup {
    size: usize,
    deadline: Duration,
}

impl LocalGroup {
    /// A group of `size` workers.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "a worker group needs at least one rank");
        Self {
            size,
            deadline: DEFAULT_RECV_DEADLINE,
        }
    }

    /// Set how long a receive waits for its peer before failing.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Create the connected transports, one per rank, in rank order.
    pub fn transports(&self) -> Vec<LocalTransport> {
        let size = self.size;
        let mut outboxes: Vec<Vec<Sender<Envelope>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();
        let mut inboxes: Vec<Vec<Receiver<Envelope>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();

        for outbox in outboxes.iter_mut() {
            for inbox in inboxes.iter_mut() {
                let (tx, rx) = channel();
                outbox.push(tx);
                inbox.push(rx);
            }
        }

        outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(rank, (outbox, inbox))| LocalTransport {
                rank,
                size,
                deadline: self.deadline,
                outbox,
                inbox,
            })
            .collect()
    }

    /// Run `worker` on every rank, each on its own thread.
    ///
    /// Returns the results in rank order once all workers have finished.
    pub fn run<F, R>(&self, worker: F) -> Result<Vec<R>, SortError>
    where
        F: Fn(LocalTransport) -> R + Sync,
        R: Send,
    {
        let worker = &worker;
        thread::scope(|scope| {
            let handles = self
                .transports()
                .into_iter()
                .map(|transport| scope.spawn(move || worker(transport)))
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .enumerate()
                .map(|(rank, handle)| {
                    handle
                        .join()
                        .map_err(|_| SortError::WorkerPanicked { rank })
                })
                .collect()
        })
    }
}

/// One rank's end of a [`LocalGroup`].
///
/// Sends never block. Receives wait at most the group deadline.
pub struct LocalTransport {
    rank: usize,
    size: usize,
    deadline: Duration,
    outbox: Vec<Sender<Envelope>>,
    inbox: Vec<Receiver<Envelope>>,
}

impl LocalTransport {
    fn send<T: Message>(&self, dest: usize, tag: Tag, data: Vec<T>) -> Result<(), SortError> {
        trace!(
            "rank {} sends {} items to rank {dest} ({tag:?})",
            self.rank,
            data.len()
        );
        self.outbox[dest]
            .send(Envelope {
                tag,
                payload: Box::new(data),
            })
            .map_err(|_| SortError::PeerDisconnected { peer: dest })
    }

    fn receive<T: Message>(&self, source: usize, tag: Tag) -> Result<Vec<T>, SortError> {
        let envelope = self.inbox[source]
            .recv_timeout(self.deadline)
            .map_err(|err| match err {
                RecvTimeoutError::Timeout => SortError::PeerTimeout { peer: source },
                RecvTimeoutError::Disconnected => SortError::PeerDisconnected { peer: source },
            })?;

        if envelope.tag != tag {
            return Err(SortError::ProtocolViolation(format!(
                "rank {} expected {tag:?} from rank {source}, got {:?}",
                self.rank, envelope.tag
            )));
        }

        envelope
            .payload
            .downcast::<Vec<T>>()
            .map(|data| *data)
            .map_err(|_| {
                SortError::ProtocolViolation(format!(
                    "rank {} received a payload of unexpected type from rank {source}",
                    self.rank
                ))
            })
    }

    fn receive_exact<T: Message>(
        &self,
        source: usize,
        tag: Tag,
        len: usize,
    ) -> Result<Vec<T>, SortError> {
        let data = self.receive::<T>(source, tag)?;
        if data.len() != len {
            return Err(SortError::ProtocolViolation(format!(
                "rank {} expected {len} items from rank {source}, got {}",
                self.rank,
                data.len()
            )));
        }
        Ok(data)
    }
}

impl Transport for LocalTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) -> Result<(), SortError> {
        if self.rank == ROOT {
            for source in (0..self.size).filter(|&r| r != ROOT) {
                self.receive_exact::<u8>(source, Tag::Barrier, 0)?;
            }
            for dest in (0..self.size).filter(|&r| r != ROOT) {
                self.send::<u8>(dest, Tag::Barrier, Vec::new())?;
            }
        } else {
            self.send::<u8>(ROOT, Tag::Barrier, Vec::new())?;
            self.receive_exact::<u8>(ROOT, Tag::Barrier, 0)?;
        }
        Ok(())
    }

    fn broadcast<T: Message>(&self, buf: &mut [T], root: usize) -> Result<(), SortError> {
        if self.rank == root {
            for dest in (0..self.size).filter(|&r| r != root) {
                self.send(dest, Tag::Broadcast, buf.to_vec())?;
            }
        } else {
            let data = self.receive_exact::<T>(root, Tag::Broadcast, buf.len())?;
            buf.copy_from_slice(&data);
        }
        Ok(())
    }

    fn scatter<T: Message>(
        &self,
        send: Option<&[T]>,
        chunk_len: usize,
        root: usize,
    ) -> Result<Vec<T>, SortError> {
        if self.rank != root {
            return self.receive_exact(root, Tag::Scatter, chunk_len);
        }

        let send = check_scatter_input(send, chunk_len, self.size, self.rank)?;
        let mut own = Vec::new();
        for (dest, chunk) in (0..self.size).zip(chunk_iter(send, chunk_len, self.size)) {
            if dest == root {
                own = chunk.to_vec();
            } else {
                self.send(dest, Tag::Scatter, chunk.to_vec())?;
            }
        }
        Ok(own)
    }

    fn gather<T: Message>(&self, local: &[T], root: usize) -> Result<Option<Vec<T>>, SortError> {
        if self.rank != root {
            self.send(root, Tag::Gather, local.to_vec())?;
            return Ok(None);
        }

        let mut gathered = Vec::with_capacity(local.len() * self.size);
        for source in 0..self.size {
            if source == root {
                gathered.extend_from_slice(local);
            } else {
                gathered.extend(self.receive::<T>(source, Tag::Gather)?);
            }
        }
        Ok(Some(gathered))
    }

    fn all_gather<T: Message>(&self, local: &[T]) -> Result<Vec<T>, SortError> {
        for dest in (0..self.size).filter(|&r| r != self.rank) {
            self.send(dest, Tag::AllGather, local.to_vec())?;
        }

        let mut gathered = Vec::with_capacity(local.len() * self.size);
        for source in 0..self.size {
            if source == self.rank {
                gathered.extend_from_slice(local);
            } else {
                gathered.extend(self.receive_exact::<T>(source, Tag::AllGather, local.len())?);
            }
        }
        Ok(gathered)
    }

    fn all_to_all<T: Message>(&self, blocks: Vec<Vec<T>>) -> Result<Vec<Vec<T>>, SortError> {
        check_block_count(blocks.len(), self.size)?;

        // All sends go out before the first receive, so no rank can wait on
        // a peer that is itself waiting.
        let mut own = Vec::new();
        for (dest, block) in blocks.into_iter().enumerate() {
            if dest == self.rank {
                own = block;
            } else {
                self.send(dest, Tag::AllToAll, block)?;
            }
        }

        let mut inbound = Vec::with_capacity(self.size);
        for source in 0..self.size {
            if source == self.rank {
                inbound.push(std::mem::take(&mut own));
            } else {
                inbound.push(self.receive(source, Tag::AllToAll)?);
            }
        }
        Ok(inbound)
    }
}

fn chunk_iter<T>(data: &[T], chunk_len: usize, count: usize) -> impl Iterator<Item = &[T]> {
    (0..count).map(move |index| &data[index * chunk_len..(index + 1) * chunk_len])
}
