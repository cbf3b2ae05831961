//! # Chain Flows
//!
//! Producers take turns building blocks with the assembler; every block goes
//! through the full validation rule chain and fork choice of the acceptance
//! service.

#[cfg(test)]
mod tests {
    use super::super::init_tracing;
    use pc_02_chain_acceptance::adapters::InMemoryTransactionPool;
    use pc_02_chain_acceptance::test_utils::{Fixture, Harness};
    use pc_02_chain_acceptance::{BlockStore, ImportResult};
    use pc_03_block_production::{BlockAssembler, BlockProductionConfig, BlockProductionError};
    use shared_types::Block;
    use std::sync::Arc;

    fn assembler(harness: &Harness, producer: usize, pool: &Arc<InMemoryTransactionPool>) -> BlockAssembler {
        let fixture = &harness.fixture;
        BlockAssembler::new(
            BlockProductionConfig::default(),
            fixture.config.clone(),
            fixture.keys[producer].clone(),
            pool.clone(),
            fixture.ledger.clone(),
            fixture.ledger.clone(),
            harness.clock.clone(),
        )
    }

    fn is_irreversible(harness: &Harness, block: &Block) -> bool {
        harness
            .store
            .get_block_by_hash(&block.hash())
            .map(|stored| stored.is_irreversible())
            .unwrap_or(false)
    }

    #[test]
    fn test_single_producer_blocks_are_irreversible_on_import() {
        init_tracing();
        let harness = Harness::new(Fixture::new(1));
        let pool = Arc::new(InMemoryTransactionPool::new());
        let producer = assembler(&harness, 0, &pool);

        let mut parent = harness.fixture.genesis.clone();
        for round in 0..3 {
            harness.clock.set(harness.fixture.slot_time(round, 0));
            let block = producer
                .build(&parent, &harness.fixture.list, b"")
                .expect("own slot");

            assert_eq!(harness.connect(&block), ImportResult::ImportedBest);
            assert!(is_irreversible(&harness, &block));
            parent = block;
        }
        assert_eq!(harness.chain.best_block().number(), 3);
    }

    #[test]
    fn test_round_robin_round_builds_one_chain() {
        init_tracing();
        let harness = Harness::new(Fixture::new(3));
        let fixture = &harness.fixture;
        let pool = Arc::new(InMemoryTransactionPool::new());
        pool.add(fixture.transfer(0, 0));

        let mut built = Vec::new();
        let mut parent = fixture.genesis.clone();
        for index in 0..3 {
            harness.clock.set(fixture.slot_time(0, index));
            let block = assembler(&harness, index, &pool)
                .build(&parent, &fixture.list, b"")
                .expect("own slot");
            assert_eq!(harness.connect(&block), ImportResult::ImportedBest);
            built.push(block.clone());
            parent = block;
        }

        // The pooled transfer went into the first block only.
        assert_eq!(built[0].transactions().len(), 3);
        assert_eq!(harness.chain.best_block().hash(), built[2].hash());

        // Every producer has now built on #1; #2 lacks producer 0.
        assert!(is_irreversible(&harness, &built[0]));
        assert!(!is_irreversible(&harness, &built[1]));
        assert!(!is_irreversible(&harness, &built[2]));
    }

    #[test]
    fn test_block_outside_its_slot_is_rejected() {
        init_tracing();
        let harness = Harness::new(Fixture::new(2));
        let fixture = &harness.fixture;
        let block1 = fixture.block_after(&fixture.genesis, 0, vec![]);
        assert_eq!(harness.connect(&block1), ImportResult::ImportedBest);

        // Producer 0 signs a block in producer 1's slot.
        let foreign_slot = fixture.block_with(&block1, 0, fixture.slot_time(0, 1), vec![]);
        assert_eq!(harness.connect(&foreign_slot), ImportResult::InvalidBlock);
        assert_eq!(harness.chain.best_block().hash(), block1.hash());

        // The assembler refuses to build the same candidate.
        harness.clock.set(fixture.slot_time(0, 1));
        let pool = Arc::new(InMemoryTransactionPool::new());
        let result = assembler(&harness, 0, &pool).build(&block1, &fixture.list, b"");
        assert!(matches!(result, Err(BlockProductionError::CandidateRejected(_))));

        // Producer 1 fills its own slot.
        let block2 = assembler(&harness, 1, &pool)
            .build(&block1, &fixture.list, b"")
            .expect("own slot");
        assert_eq!(harness.connect(&block2), ImportResult::ImportedBest);
    }

    #[test]
    fn test_longer_fork_from_other_producers_takes_over() {
        init_tracing();
        let harness = Harness::new(Fixture::new(4));
        let fixture = &harness.fixture;
        let genesis = &fixture.genesis;

        let a1 = fixture.block_with(genesis, 0, fixture.slot_time(0, 0), vec![]);
        assert_eq!(harness.connect(&a1), ImportResult::ImportedBest);

        let pool = Arc::new(InMemoryTransactionPool::new());
        harness.clock.set(fixture.slot_time(0, 1));
        let b1 = assembler(&harness, 1, &pool)
            .build(genesis, &fixture.list, b"")
            .expect("own slot");
        assert_eq!(harness.connect(&b1), ImportResult::ImportedNotBest);
        assert_eq!(harness.chain.best_block().hash(), a1.hash());

        harness.clock.set(fixture.slot_time(0, 2));
        let b2 = assembler(&harness, 2, &pool)
            .build(&b1, &fixture.list, b"")
            .expect("own slot");
        assert_eq!(harness.connect(&b2), ImportResult::ImportedBest);

        assert_eq!(harness.chain.best_block().hash(), b2.hash());
        assert_eq!(
            harness.chain.get_block_by_number(1).map(|b| b.hash()),
            Some(b1.hash())
        );
        assert_eq!(harness.chain.metrics().snapshot().rebranches, 1);
    }
}
