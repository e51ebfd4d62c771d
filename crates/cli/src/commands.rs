//! Subcommands and the in-process cluster they run against.

use anyhow::Context;
use bytes::Bytes;
use clap::Subcommand;
use corelib::{Block, HashId, HashRing, Location, RequestOptions, RingBuilder, TypedBlock};
use replication::{run_shift_worker, BlockRing, LocalCluster, LogRing, RingConfig};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the replica set for a key
    Locate {
        key: String,
    },

    /// Store a block, then read it back
    Put {
        data: String,
    },

    /// Append entries to a block-backed log
    Append {
        key: String,
        #[arg(required = true)]
        data: Vec<String>,
    },

    /// Append transactions to a transaction log
    Tx {
        key: String,
        #[arg(required = true)]
        data: Vec<String>,
    },
}

/// What a subcommand did, ready to print.
#[derive(Debug)]
pub enum CommandResult {
    Located {
        key: String,
        replicas: Vec<Location>,
    },
    Stored {
        id: HashId,
        size: usize,
        holder: Location,
        shifted: usize,
    },
    Appended {
        key: String,
        height: u64,
        entries: Vec<HashId>,
        holder: Location,
    },
    Committed {
        key: String,
        height: u64,
        last_tx: HashId,
    },
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandResult::Located { key, replicas } => {
                write!(f, "{} ({} replicas)", key, replicas.len())?;
                for loc in replicas {
                    write!(f, "\n  {}", loc)?;
                }
                Ok(())
            }
            CommandResult::Stored {
                id,
                size,
                holder,
                shifted,
            } => {
                write!(f, "block {}\n  size:    {}\n  read at: {}", id, size, holder)?;
                if *shifted > 0 {
                    write!(f, "\n  shifted: {}", shifted)?;
                }
                Ok(())
            }
            CommandResult::Appended {
                key,
                height,
                entries,
                holder,
            } => {
                write!(f, "log {} at height {} (read at {})", key, height, holder)?;
                for id in entries {
                    write!(f, "\n  {}", id)?;
                }
                Ok(())
            }
            CommandResult::Committed { key, height, last_tx } => {
                write!(f, "tx log {} at height {}\n  head: {}", key, height, last_tx)
            }
        }
    }
}

/// A ring of `host-0..host-N`, each vnode served from a shared [`LocalCluster`].
pub struct Session {
    ring: Arc<HashRing>,
    cluster: Arc<LocalCluster>,
    blocks: BlockRing,
    log: LogRing,
    opts: RequestOptions,
    shift_worker: Option<JoinHandle<usize>>,
}

impl Session {
    /// Must be called from within a tokio runtime when proximity shifting is
    /// enabled, since the shift worker is spawned here.
    pub fn start(hosts: usize, vnodes: usize, config: &RingConfig) -> anyhow::Result<Self> {
        let ring = (0..hosts)
            .fold(RingBuilder::new().with_vnodes(vnodes), |b, i| b.add_host(format!("host-{}", i)))
            .build();
        let ring = Arc::new(ring);
        let cluster = Arc::new(LocalCluster::new());
        let opts = config.request_options();

        let (outlet, shift_worker) = if config.proximity_shift.enabled {
            let (tx, rx) = mpsc::channel(config.proximity_shift.queue_depth);
            let worker = tokio::spawn(run_shift_worker(rx, cluster.clone()));
            (Some(tx), Some(worker))
        } else {
            (None, None)
        };

        info!(
            hosts,
            vnodes = ring.vnode_count(),
            peer_set_size = opts.peer_set_size,
            shifting = outlet.is_some(),
            "Cluster ready"
        );

        let blocks = BlockRing::new(ring.clone(), cluster.clone(), cluster.clone(), outlet)
            .with_defaults(opts.clone());
        let log = LogRing::new(ring.clone(), cluster.clone(), None);

        Ok(Self {
            ring,
            cluster,
            blocks,
            log,
            opts,
            shift_worker,
        })
    }

    /// Mark every vnode of `host` unreachable.
    pub fn take_down(&self, host: &str) -> anyhow::Result<()> {
        let vnodes = self.ring.vnodes_of(host)?;
        for vnode in &vnodes {
            self.cluster.set_down(&vnode.id, true);
        }
        info!(host, vnodes = vnodes.len(), "Host marked down");
        Ok(())
    }

    /// Close the hint outlet and wait for the shift worker to drain it.
    async fn finish(self) -> anyhow::Result<usize> {
        let Session { blocks, shift_worker, .. } = self;
        drop(blocks);
        match shift_worker {
            Some(worker) => Ok(worker.await.context("shift worker")?),
            None => Ok(0),
        }
    }
}

impl Command {
    pub async fn execute(&self, session: Session) -> anyhow::Result<CommandResult> {
        match self {
            Command::Locate { key } => {
                let replicas = session
                    .blocks
                    .router()
                    .locate_replicated_key(key.as_bytes(), session.opts.effective_peer_set_size())
                    .await?;
                Ok(CommandResult::Located {
                    key: key.clone(),
                    replicas,
                })
            }

            Command::Put { data } => {
                let block = Block::data(Bytes::from(data.clone().into_bytes()));
                let id = block.id();
                let primary = session.blocks.set_block(&block, None).await?;

                // With shifting on, ask the rest of the replica set to take a copy.
                if session.blocks.proximity_shifting_enabled() {
                    let replicas = session
                        .blocks
                        .router()
                        .locate_replicated_hash(&id, session.opts.effective_peer_set_size())
                        .await?;
                    for loc in replicas.into_iter().filter(|l| l.vnode.id != primary.vnode.id) {
                        session.blocks.request_shift(block.clone(), loc);
                    }
                }

                let (holder, stored) = session.blocks.get_block(&id, None).await?;
                let shifted = session.finish().await?;
                Ok(CommandResult::Stored {
                    id,
                    size: stored.len(),
                    holder,
                    shifted,
                })
            }

            Command::Append { key, data } => {
                let key_bytes = key.as_bytes();
                let mut head = None;
                for datum in data {
                    let (mut entry, at) = session.blocks.new_entry(key_bytes, &session.opts).await?;
                    entry.data = datum.as_bytes().to_vec();
                    session.blocks.propose_entry(&entry, &session.opts).await?;
                    session.blocks.commit_entry(&entry, &session.opts).await?;

                    // Publish under the content address so the entry is readable by id.
                    let block = entry.to_block()?;
                    session.blocks.set_block(&block, None).await?;
                    info!(key = %key, height = entry.height, allocated_at = %at, "Entry committed");
                    head = Some(block.id());
                }

                if let Some(id) = head {
                    let (_, entry) = session.blocks.get_entry(&id, &session.opts).await?;
                    anyhow::ensure!(entry.key == key_bytes, "entry {} belongs to another log", id.short());
                }

                let (holder, log) = session.blocks.get_log_block(key_bytes, None).await?;
                Ok(CommandResult::Appended {
                    key: key.clone(),
                    height: log.height,
                    entries: log.entries,
                    holder,
                })
            }

            Command::Tx { key, data } => {
                let key_bytes = key.as_bytes();
                let mut last = None;
                for datum in data {
                    let (mut tx, _) = session.log.new_tx(key_bytes, &session.opts).await?;
                    tx.data = datum.as_bytes().to_vec();
                    session.log.propose_tx(&tx, &session.opts).await?;
                    session.log.commit_tx(&tx, &session.opts).await?;
                    last = Some(tx.id());
                }

                // The id's replica set need not overlap the key's, so the read
                // walks every host.
                let id = last.context("no transactions given")?;
                let read_opts = RequestOptions {
                    peer_set_size: session.ring.host_count(),
                    ..session.opts.clone()
                };
                let (_, meta) = session.log.get_tx(&id, &read_opts).await?;
                Ok(CommandResult::Committed {
                    key: key.clone(),
                    height: meta.height,
                    last_tx: meta.last_tx,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn session() -> Session {
        Session::start(5, 8, &RingConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_locate_lists_distinct_hosts() {
        let result = Command::Locate { key: "k".into() }.execute(session()).await.unwrap();
        match result {
            CommandResult::Located { replicas, .. } => {
                assert_eq!(replicas.len(), 3);
                let hosts: HashSet<_> = replicas.iter().map(|l| l.vnode.host.clone()).collect();
                assert_eq!(hosts.len(), 3);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_put_reads_from_primary() {
        let result = Command::Put { data: "hello".into() }.execute(session()).await.unwrap();
        match result {
            CommandResult::Stored { size, holder, shifted, .. } => {
                assert_eq!(size, 5);
                assert!(holder.is_primary());
                assert_eq!(shifted, 0);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_put_with_shifting_copies_to_replicas() {
        let mut config = RingConfig::default();
        config.proximity_shift.enabled = true;
        let session = Session::start(5, 8, &config).unwrap();

        let result = Command::Put { data: "spread".into() }.execute(session).await.unwrap();
        assert!(matches!(result, CommandResult::Stored { shifted: 2, .. }));
    }

    #[tokio::test]
    async fn test_append_builds_log() {
        let cmd = Command::Append {
            key: "journal".into(),
            data: vec!["a".into(), "b".into(), "c".into()],
        };
        match cmd.execute(session()).await.unwrap() {
            CommandResult::Appended { height, entries, .. } => {
                assert_eq!(height, 3);
                assert_eq!(entries.len(), 3);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tx_chain_height() {
        let cmd = Command::Tx {
            key: "orders".into(),
            data: vec!["one".into(), "two".into()],
        };
        match cmd.execute(session()).await.unwrap() {
            CommandResult::Committed { height, .. } => assert_eq!(height, 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tx_reads_back_on_wide_ring() {
        let session = Session::start(12, 4, &RingConfig::default()).unwrap();
        let cmd = Command::Tx {
            key: "ledger".into(),
            data: vec!["a".into(), "b".into(), "c".into()],
        };
        match cmd.execute(session).await.unwrap() {
            CommandResult::Committed { height, last_tx, .. } => {
                assert_eq!(height, 3);
                assert!(!last_tx.is_zero());
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_down_host() {
        assert!(session().take_down("host-99").is_err());
    }

    #[tokio::test]
    async fn test_down_replica_fails_propose() {
        let session = session();
        let replicas = session
            .blocks
            .router()
            .locate_replicated_key(b"journal", 3)
            .await
            .unwrap();
        session.take_down(&replicas[1].vnode.host).unwrap();

        let cmd = Command::Append {
            key: "journal".into(),
            data: vec!["a".into()],
        };
        assert!(cmd.execute(session).await.is_err());
    }
}
