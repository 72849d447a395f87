// Integration tests for the voter weight pipeline over an in-memory ledger
//
// Test Coverage:
//
// === Weight Aggregation ===
// 1. test_locked_stake_into_quadratic - Transform applied to upstream weight
// 2. test_council_falls_back_to_vanilla - Empty population uses the deposit
// 3. test_unconfigured_plugins_fall_back_to_vanilla - Only excluded plugins
// 4. test_missing_record_counts_zero_unconfigured_is_excluded - NoRecord vs NotConfigured
// 5. test_transform_doubles_running_weight - Chained input flows through
// 6. test_transform_first_starts_from_vanilla - Vanilla materialised as input
// 7. test_additive_plugin_sums_with_predecessor - Additive composition
// 8. test_gateway_pass_gates_weight - Valid, expired and missing passes
// 9. test_results_follow_configuration_order - Order under injected latency
// 10. test_weight_is_deterministic - Same inputs, same result
// 11. test_max_weight - Max voter weight through the chain
// 12. test_token_deposit_weight - Digit shifted deposits
// 13. test_token_haver_counts_held_mints - Held, unfrozen mints
//
// === Failures ===
// 14. test_required_plugin_without_registrar_fails - ResolutionFailure
// 15. test_transport_failure_aborts - No partial result
// 16. test_unknown_realm - RealmNotFound
//
// === Pre-Vote Operations ===
// 17. test_operations_chain_input_records - Each update reads its predecessor
// 18. test_operations_are_idempotent - Created records are not recreated
// 19. test_batches_preserve_operation_order - Chunking keeps order
// 20. test_nft_cast_vote_is_chunked - Cast vote split per NFT limit
// 21. test_nft_relinquish_runs_after_governance_instruction - Post operations
//
// === Configuration and Selection ===
// 22. test_on_chain_config_walks_plugin_chain - Registrar chain discovery
// 23. test_on_chain_config_reads_council_addin - Council addin at its on-chain offset
// 24. test_superseded_computation_is_not_published - Stale results dropped
// 25. test_interleaved_refreshes_publish_latest_selection - Late stale result never published

mod utils;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use solana_sdk::pubkey::Pubkey;
use utils::*;
use voter_weight_client::{
    constants::*,
    helpers::instruction_discriminator,
    state::{CollectionConfig, QuadraticCoefficients},
    ComputationKey, Composition, GovernanceAction, OnChainRealmConfig, PipelineConfig, PluginKind, PluginRegistry,
    Population, ProgramDirectory, RealmConfigSource, RetryPolicy, Tracked, VoterWeightError, VoterWeightService,
};

fn square_root() -> QuadraticCoefficients {
    QuadraticCoefficients::new(10.0, 0.0, 0.0)
}

fn doubling() -> QuadraticCoefficients {
    QuadraticCoefficients::new(0.0, 2.0, 0.0)
}

fn method(data: &[u8]) -> &[u8] {
    &data[..8]
}

#[tokio::test]
async fn test_locked_stake_into_quadratic() {
    println!("[TEST START] test_locked_stake_into_quadratic");
    let fx = setup_realm().await;
    let (realm, mint) = (fx.realm, fx.community_mint);

    write_locked_stake_registrar(&fx.ledger, &realm, &mint).await;
    write_quadratic_registrar(&fx.ledger, &realm, &mint, square_root(), Some(&LOCKED_STAKE_PROGRAM_ID)).await;
    let small = Pubkey::new_unique();
    let large = Pubkey::new_unique();
    write_locked_stake_voter(&fx.ledger, &realm, &mint, &small, 1_000).await;
    write_locked_stake_voter(&fx.ledger, &realm, &mint, &large, 4_000).await;
    println!("[Setup] Locked stake and quadratic registrars staged");

    let service = fx.service(vec![plugin(PluginKind::LockedStake), plugin(PluginKind::Quadratic)]);
    let weight = service
        .get_calculated_weight(&realm, Population::Community, &small)
        .await
        .unwrap();
    println!("[Action] Calculated weight: {}", weight.total_weight);

    assert_eq!(weight.total_weight, 316);
    assert_eq!(weight.details.len(), 2);
    assert_eq!(weight.details[0].plugin_name, "locked-stake");
    assert_eq!(weight.details[0].weight, 1_000);
    assert_eq!(weight.details[0].expiry, Some(CURRENT_SLOT));
    assert_eq!(weight.details[1].plugin_name, "quadratic");
    assert_eq!(weight.details[1].program_id, QUADRATIC_PROGRAM_ID);
    assert_eq!(weight.details[1].weight, 316);

    let weight = service
        .get_calculated_weight(&realm, Population::Community, &large)
        .await
        .unwrap();
    assert_eq!(weight.total_weight, 632);
    println!("[TEST END] test_locked_stake_into_quadratic - 1000 -> 316, 4000 -> 632");
}

#[tokio::test]
async fn test_council_falls_back_to_vanilla() {
    println!("[TEST START] test_council_falls_back_to_vanilla");
    let fx = setup_realm().await;
    let member = Pubkey::new_unique();
    write_token_owner_record(&fx.ledger, &fx.realm, &fx.council_mint, &member, 3).await;
    println!("[Setup] Council token owner record with deposit 3");

    let service = fx.service(vec![plugin(PluginKind::LockedStake)]);
    let weight = service
        .get_calculated_weight(&fx.realm, Population::Council, &member)
        .await
        .unwrap();
    println!("[Action] Calculated council weight");

    assert_eq!(weight.total_weight, 3);
    assert_eq!(weight.details.len(), 1);
    assert_eq!(weight.details[0].plugin_name, VANILLA_PLUGIN_NAME);
    assert_eq!(weight.details[0].program_id, GOVERNANCE_PROGRAM_ID);
    println!("[TEST END] test_council_falls_back_to_vanilla - Single vanilla contribution");
}

#[tokio::test]
async fn test_unconfigured_plugins_fall_back_to_vanilla() {
    println!("[TEST START] test_unconfigured_plugins_fall_back_to_vanilla");
    let fx = setup_realm().await;
    let member = Pubkey::new_unique();
    write_token_owner_record(&fx.ledger, &fx.realm, &fx.community_mint, &member, 42).await;
    println!("[Setup] No registrars staged");

    let service = fx.service(vec![plugin(PluginKind::LockedStake), plugin(PluginKind::NftHolding)]);
    let weight = service
        .get_calculated_weight(&fx.realm, Population::Community, &member)
        .await
        .unwrap();

    assert_eq!(weight.total_weight, 42);
    assert_eq!(weight.details.len(), 1);
    assert_eq!(weight.details[0].plugin_name, VANILLA_PLUGIN_NAME);
    println!("[TEST END] test_unconfigured_plugins_fall_back_to_vanilla - Deposit used");
}

#[tokio::test]
async fn test_missing_record_counts_zero_unconfigured_is_excluded() {
    println!("[TEST START] test_missing_record_counts_zero_unconfigured_is_excluded");
    let fx = setup_realm().await;
    let member = Pubkey::new_unique();
    write_token_owner_record(&fx.ledger, &fx.realm, &fx.community_mint, &member, 500).await;
    write_locked_stake_registrar(&fx.ledger, &fx.realm, &fx.community_mint).await;
    println!("[Setup] Locked stake configured, member never deposited; nft not configured");

    let service = fx.service(vec![plugin(PluginKind::LockedStake), plugin(PluginKind::NftHolding)]);
    let weight = service
        .get_calculated_weight(&fx.realm, Population::Community, &member)
        .await
        .unwrap();

    // The missing voter is a zero contribution, not a fallback to the deposit
    assert_eq!(weight.total_weight, 0);
    assert_eq!(weight.details.len(), 1);
    assert_eq!(weight.details[0].plugin_name, "locked-stake");
    assert_eq!(weight.details[0].weight, 0);
    println!("[TEST END] test_missing_record_counts_zero_unconfigured_is_excluded - NoRecord kept, NotConfigured dropped");
}

#[tokio::test]
async fn test_transform_doubles_running_weight() {
    println!("[TEST START] test_transform_doubles_running_weight");
    let fx = setup_realm().await;
    let member = Pubkey::new_unique();
    write_locked_stake_registrar(&fx.ledger, &fx.realm, &fx.community_mint).await;
    write_locked_stake_voter(&fx.ledger, &fx.realm, &fx.community_mint, &member, 1_000).await;
    write_quadratic_registrar(&fx.ledger, &fx.realm, &fx.community_mint, doubling(), None).await;

    let service = fx.service(vec![plugin(PluginKind::LockedStake), plugin(PluginKind::Quadratic)]);
    let weight = service
        .get_calculated_weight(&fx.realm, Population::Community, &member)
        .await
        .unwrap();

    assert_eq!(weight.total_weight, 2_000);
    assert_eq!(weight.details[0].weight, 1_000);
    assert_eq!(weight.details[1].weight, 2_000);
    println!("[TEST END] test_transform_doubles_running_weight - 1000 doubled");
}

#[tokio::test]
async fn test_transform_first_starts_from_vanilla() {
    println!("[TEST START] test_transform_first_starts_from_vanilla");
    let fx = setup_realm().await;
    let member = Pubkey::new_unique();
    write_token_owner_record(&fx.ledger, &fx.realm, &fx.community_mint, &member, 300).await;
    write_quadratic_registrar(&fx.ledger, &fx.realm, &fx.community_mint, doubling(), None).await;
    println!("[Setup] Quadratic is the only plugin");

    let service = fx.service(vec![plugin(PluginKind::Quadratic)]);
    let weight = service
        .get_calculated_weight(&fx.realm, Population::Community, &member)
        .await
        .unwrap();

    assert_eq!(weight.total_weight, 600);
    assert_eq!(weight.details.len(), 2);
    assert_eq!(weight.details[0].plugin_name, VANILLA_PLUGIN_NAME);
    assert_eq!(weight.details[0].weight, 300);
    assert_eq!(weight.details[1].weight, 600);
    println!("[TEST END] test_transform_first_starts_from_vanilla - Deposit fed to quadratic");
}

#[tokio::test]
async fn test_additive_plugin_sums_with_predecessor() {
    println!("[TEST START] test_additive_plugin_sums_with_predecessor");
    let fx = setup_realm().await;
    let member = Pubkey::new_unique();
    let collection = Pubkey::new_unique();
    write_locked_stake_registrar(&fx.ledger, &fx.realm, &fx.community_mint).await;
    write_locked_stake_voter(&fx.ledger, &fx.realm, &fx.community_mint, &member, 1_000).await;
    write_nft_registrar(
        &fx.ledger,
        &fx.realm,
        &fx.community_mint,
        vec![CollectionConfig::new(&collection, 100, 5)],
    )
    .await;
    give_nfts(&fx.ledger, &member, &collection, 2).await;
    println!("[Setup] 1000 staked, 2 NFTs worth 5 each");

    let service = fx.service(vec![
        plugin(PluginKind::LockedStake),
        plugin(PluginKind::NftHolding).additive(),
    ]);
    let weight = service
        .get_calculated_weight(&fx.realm, Population::Community, &member)
        .await
        .unwrap();

    assert_eq!(weight.total_weight, 1_010);
    assert_eq!(weight.details[1].weight, 10);
    assert_eq!(weight.details[1].composition, Composition::Additive);

    // Without the additive flag the NFT weight replaces the stake
    let service = fx.service(vec![plugin(PluginKind::LockedStake), plugin(PluginKind::NftHolding)]);
    let weight = service
        .get_calculated_weight(&fx.realm, Population::Community, &member)
        .await
        .unwrap();
    assert_eq!(weight.total_weight, 10);
    println!("[TEST END] test_additive_plugin_sums_with_predecessor - 1000 + 10");
}

#[tokio::test]
async fn test_gateway_pass_gates_weight() {
    println!("[TEST START] test_gateway_pass_gates_weight");
    let fx = setup_realm().await;
    let network = Pubkey::new_unique();
    write_locked_stake_registrar(&fx.ledger, &fx.realm, &fx.community_mint).await;
    write_gateway_registrar(
        &fx.ledger,
        &fx.realm,
        &fx.community_mint,
        &network,
        Some(&LOCKED_STAKE_PROGRAM_ID),
    )
    .await;

    let verified = Pubkey::new_unique();
    let expired = Pubkey::new_unique();
    let unverified = Pubkey::new_unique();
    for member in [&verified, &expired, &unverified] {
        write_locked_stake_voter(&fx.ledger, &fx.realm, &fx.community_mint, member, 1_000).await;
    }
    write_gateway_token(&fx.ledger, &verified, &network, Some(NOW + 3_600)).await;
    write_gateway_token(&fx.ledger, &expired, &network, Some(NOW - 1)).await;
    println!("[Setup] Valid pass, expired pass, no pass");

    let service = fx.service(vec![plugin(PluginKind::LockedStake), plugin(PluginKind::Gateway)]);
    let weight_of = |member: Pubkey| {
        let service = &service;
        let realm = fx.realm;
        async move {
            service
                .get_calculated_weight(&realm, Population::Community, &member)
                .await
                .unwrap()
        }
    };

    assert_eq!(weight_of(verified).await.total_weight, 1_000);
    assert_eq!(weight_of(expired).await.total_weight, 0);

    let weight = weight_of(unverified).await;
    assert_eq!(weight.total_weight, 0);
    assert_eq!(weight.details.len(), 2);
    assert_eq!(weight.details[1].plugin_name, "gateway");
    println!("[TEST END] test_gateway_pass_gates_weight - Only the valid pass keeps weight");
}

#[tokio::test]
async fn test_results_follow_configuration_order() {
    println!("[TEST START] test_results_follow_configuration_order");
    let fx = setup_realm().await;
    let member = Pubkey::new_unique();
    let collection = Pubkey::new_unique();
    let vsr_registrar = write_locked_stake_registrar(&fx.ledger, &fx.realm, &fx.community_mint).await;
    write_locked_stake_voter(&fx.ledger, &fx.realm, &fx.community_mint, &member, 1_000).await;
    let nft_registrar = write_nft_registrar(
        &fx.ledger,
        &fx.realm,
        &fx.community_mint,
        vec![CollectionConfig::new(&collection, 10, 7)],
    )
    .await;
    give_nfts(&fx.ledger, &member, &collection, 1).await;

    let service = fx.service(vec![
        plugin(PluginKind::LockedStake),
        plugin(PluginKind::NftHolding).additive(),
    ]);

    for (vsr_ms, nft_ms) in [(40, 0), (0, 40), (15, 30), (30, 5)] {
        fx.cache.clear().await;
        fx.ledger.set_latency(vsr_registrar, Duration::from_millis(vsr_ms)).await;
        fx.ledger.set_latency(nft_registrar, Duration::from_millis(nft_ms)).await;
        println!("[Action] Latency locked-stake={}ms nft={}ms", vsr_ms, nft_ms);

        let weight = service
            .get_calculated_weight(&fx.realm, Population::Community, &member)
            .await
            .unwrap();
        let names: Vec<&str> = weight.details.iter().map(|d| d.plugin_name.as_str()).collect();
        assert_eq!(names, vec!["locked-stake", "nft-holding"]);
        assert_eq!(weight.total_weight, 1_007);
    }
    println!("[TEST END] test_results_follow_configuration_order - Completion order ignored");
}

#[tokio::test]
async fn test_weight_is_deterministic() {
    println!("[TEST START] test_weight_is_deterministic");
    let fx = setup_realm().await;
    let member = Pubkey::new_unique();
    write_locked_stake_registrar(&fx.ledger, &fx.realm, &fx.community_mint).await;
    write_locked_stake_voter(&fx.ledger, &fx.realm, &fx.community_mint, &member, 2_500).await;
    write_quadratic_registrar(&fx.ledger, &fx.realm, &fx.community_mint, square_root(), None).await;

    let service = fx.service(vec![plugin(PluginKind::LockedStake), plugin(PluginKind::Quadratic)]);
    let first = service
        .get_calculated_weight(&fx.realm, Population::Community, &member)
        .await
        .unwrap();
    let second = service
        .get_calculated_weight(&fx.realm, Population::Community, &member)
        .await
        .unwrap();

    fx.cache.clear().await;
    let uncached = service
        .get_calculated_weight(&fx.realm, Population::Community, &member)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first, uncached);
    assert_eq!(first.total_weight, 500);
    println!("[TEST END] test_weight_is_deterministic - Identical results");
}

#[tokio::test]
async fn test_max_weight() {
    println!("[TEST START] test_max_weight");
    let fx = setup_realm().await;
    write_locked_stake_registrar(&fx.ledger, &fx.realm, &fx.community_mint).await;
    write_quadratic_registrar(&fx.ledger, &fx.realm, &fx.community_mint, square_root(), None).await;

    let service = fx.service(vec![plugin(PluginKind::LockedStake), plugin(PluginKind::Quadratic)]);
    let max = service
        .get_calculated_max_weight(&fx.realm, Population::Community)
        .await
        .unwrap();
    println!("[Action] Community max weight: {}", max.total_weight);

    // sqrt(10_000) * 10
    assert_eq!(max.details[0].weight, COMMUNITY_SUPPLY);
    assert_eq!(max.total_weight, 1_000);

    let council = service
        .get_calculated_max_weight(&fx.realm, Population::Council)
        .await
        .unwrap();
    assert_eq!(council.total_weight, COUNCIL_SUPPLY);
    println!("[TEST END] test_max_weight - Max weight chained like voter weight");
}

#[tokio::test]
async fn test_token_deposit_weight() {
    println!("[TEST START] test_token_deposit_weight");
    let fx = setup_realm().await;
    let member = Pubkey::new_unique();
    let small_decimals_mint = Pubkey::new_unique();
    write_mint(&fx.ledger, &small_decimals_mint, 5).await;
    write_token_voter_registrar(
        &fx.ledger,
        &fx.realm,
        &fx.community_mint,
        &[(fx.community_mint, 0), (small_decimals_mint, 3)],
    )
    .await;
    write_token_voter(&fx.ledger, &fx.realm, &fx.community_mint, &member, &[(0, 1_000), (1, 2)]).await;
    println!("[Setup] Deposits across two voting mints");

    let service = fx.service(vec![plugin(PluginKind::TokenDeposit)]);
    let weight = service
        .get_calculated_weight(&fx.realm, Population::Community, &member)
        .await
        .unwrap();
    assert_eq!(weight.total_weight, 3_000);

    // Supply 10_000 plus 5 shifted by three digits
    let max = service
        .get_calculated_max_weight(&fx.realm, Population::Community)
        .await
        .unwrap();
    assert_eq!(max.total_weight, 15_000);

    // No voter yet: only the record creation is pending
    let newcomer = Pubkey::new_unique();
    let ops = service
        .get_pre_vote_operations(&fx.realm, Population::Community, &newcomer, GovernanceAction::CreateGovernance)
        .await
        .unwrap();
    assert_eq!(ops.pre.len(), 1);
    assert_eq!(method(&ops.pre[0].data), instruction_discriminator("create_voter_weight_record"));
    println!("[TEST END] test_token_deposit_weight - Digit shifted deposits summed");
}

#[tokio::test]
async fn test_token_haver_counts_held_mints() {
    println!("[TEST START] test_token_haver_counts_held_mints");
    let fx = setup_realm().await;
    let mints = [Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique()];
    write_token_haver_registrar(&fx.ledger, &fx.realm, &fx.community_mint, &mints).await;

    let holder = Pubkey::new_unique();
    let held = write_token_account(&fx.ledger, &holder, &mints[0], 5, false).await;
    write_token_account(&fx.ledger, &holder, &mints[1], 0, false).await;
    write_token_account(&fx.ledger, &holder, &mints[2], 9, true).await;
    println!("[Setup] One held, one empty, one frozen, one missing");

    let service = fx.service(vec![plugin(PluginKind::TokenHaver)]);
    let weight = service
        .get_calculated_weight(&fx.realm, Population::Community, &holder)
        .await
        .unwrap();
    assert_eq!(weight.total_weight, 1);

    let stranger = Pubkey::new_unique();
    let weight = service
        .get_calculated_weight(&fx.realm, Population::Community, &stranger)
        .await
        .unwrap();
    assert_eq!(weight.total_weight, 0);
    assert_eq!(weight.details[0].plugin_name, "token-haver");

    let max = service
        .get_calculated_max_weight(&fx.realm, Population::Community)
        .await
        .unwrap();
    assert_eq!(max.total_weight, 4);

    // Only the counted account is passed to the update
    let ops = service
        .get_pre_vote_operations(
            &fx.realm,
            Population::Community,
            &holder,
            GovernanceAction::CreateProposal {
                governance: Pubkey::new_unique(),
            },
        )
        .await
        .unwrap();
    let update = ops.pre.last().unwrap();
    assert_eq!(update.program_id, TOKEN_HAVER_PROGRAM_ID);
    assert!(update.accounts.iter().any(|meta| meta.pubkey == held));
    assert_eq!(
        update.accounts.iter().filter(|meta| mints.iter().any(|mint| {
            voter_weight_client::address::associated_token_account(&holder, mint) == meta.pubkey
        })).count(),
        1
    );
    println!("[TEST END] test_token_haver_counts_held_mints - Held, unfrozen mints counted");
}

#[tokio::test]
async fn test_required_plugin_without_registrar_fails() {
    println!("[TEST START] test_required_plugin_without_registrar_fails");
    let fx = setup_realm().await;
    let member = Pubkey::new_unique();
    write_token_owner_record(&fx.ledger, &fx.realm, &fx.community_mint, &member, 100).await;

    let service = fx.service(vec![plugin(PluginKind::LockedStake).required()]);
    let err = service
        .get_calculated_weight(&fx.realm, Population::Community, &member)
        .await
        .unwrap_err();
    assert!(matches!(err, VoterWeightError::ResolutionFailure { ref plugin, .. } if plugin == "locked-stake"));

    let err = service
        .get_pre_vote_operations(
            &fx.realm,
            Population::Community,
            &member,
            GovernanceAction::CastVote {
                proposal: Pubkey::new_unique(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, VoterWeightError::ResolutionFailure { .. }));
    println!("[TEST END] test_required_plugin_without_registrar_fails - No silent fallback");
}

#[tokio::test]
async fn test_transport_failure_aborts() {
    println!("[TEST START] test_transport_failure_aborts");
    let fx = setup_realm().await;
    let member = Pubkey::new_unique();
    write_locked_stake_registrar(&fx.ledger, &fx.realm, &fx.community_mint).await;
    let voter = write_locked_stake_voter(&fx.ledger, &fx.realm, &fx.community_mint, &member, 1_000).await;
    fx.ledger.make_unreachable(voter).await;
    println!("[Setup] Voter account unreachable");

    let service = fx.service(vec![plugin(PluginKind::LockedStake), plugin(PluginKind::NftHolding)]);
    let err = service
        .get_calculated_weight(&fx.realm, Population::Community, &member)
        .await
        .unwrap_err();

    assert!(matches!(err, VoterWeightError::TransportFailure { address, .. } if address == voter));
    println!("[TEST END] test_transport_failure_aborts - Error surfaced, no partial weight");
}

#[tokio::test]
async fn test_unknown_realm() {
    println!("[TEST START] test_unknown_realm");
    let fx = setup_realm().await;
    let service = fx.service(Vec::new());
    let unknown = Pubkey::new_unique();

    let err = service
        .get_calculated_weight(&unknown, Population::Community, &Pubkey::new_unique())
        .await
        .unwrap_err();
    assert!(matches!(err, VoterWeightError::RealmNotFound(realm) if realm == unknown));
    println!("[TEST END] test_unknown_realm");
}

#[tokio::test]
async fn test_operations_chain_input_records() {
    println!("[TEST START] test_operations_chain_input_records");
    let fx = setup_realm().await;
    let member = Pubkey::new_unique();
    write_locked_stake_registrar(&fx.ledger, &fx.realm, &fx.community_mint).await;
    write_locked_stake_voter(&fx.ledger, &fx.realm, &fx.community_mint, &member, 1_000).await;
    write_quadratic_registrar(&fx.ledger, &fx.realm, &fx.community_mint, square_root(), None).await;

    let service = fx.service(vec![plugin(PluginKind::LockedStake), plugin(PluginKind::Quadratic)]);
    let ops = service
        .get_pre_vote_operations(
            &fx.realm,
            Population::Community,
            &member,
            GovernanceAction::CastVote {
                proposal: Pubkey::new_unique(),
            },
        )
        .await
        .unwrap();
    println!("[Action] Assembled {} operations", ops.len());

    let update = instruction_discriminator("update_voter_weight_record");
    assert_eq!(ops.pre.len(), 4);
    assert!(ops.post.is_empty());

    assert_eq!(ops.pre[0].program_id, LOCKED_STAKE_PROGRAM_ID);
    assert_eq!(method(&ops.pre[0].data), update);
    assert_eq!(
        method(&ops.pre[1].data),
        instruction_discriminator("create_max_voter_weight_record")
    );
    assert_eq!(method(&ops.pre[2].data), instruction_discriminator("create_voter_weight_record"));

    // Quadratic reads the locked stake record as its input
    let quadratic_update = &ops.pre[3];
    assert_eq!(quadratic_update.program_id, QUADRATIC_PROGRAM_ID);
    assert_eq!(method(&quadratic_update.data), update);
    let vsr_record = voter_weight_record_address(PluginKind::LockedStake, &fx.realm, &fx.community_mint, &member);
    assert_eq!(quadratic_update.accounts[1].pubkey, vsr_record);
    println!("[TEST END] test_operations_chain_input_records - Input records chained");
}

#[tokio::test]
async fn test_operations_are_idempotent() {
    println!("[TEST START] test_operations_are_idempotent");
    let fx = setup_realm().await;
    let member = Pubkey::new_unique();
    write_locked_stake_registrar(&fx.ledger, &fx.realm, &fx.community_mint).await;
    write_locked_stake_voter(&fx.ledger, &fx.realm, &fx.community_mint, &member, 1_000).await;
    write_quadratic_registrar(&fx.ledger, &fx.realm, &fx.community_mint, square_root(), None).await;

    let service = fx.service(vec![plugin(PluginKind::LockedStake), plugin(PluginKind::Quadratic)]);
    let action = GovernanceAction::CastVote {
        proposal: Pubkey::new_unique(),
    };
    let first = service
        .get_pre_vote_operations(&fx.realm, Population::Community, &member, action)
        .await
        .unwrap();
    let repeated = service
        .get_pre_vote_operations(&fx.realm, Population::Community, &member, action)
        .await
        .unwrap();
    assert_eq!(first, repeated);
    assert_eq!(first.pre.len(), 4);

    // Land the record creations, then drop the stale cache entries
    let record = write_voter_weight_record(&fx.ledger, PluginKind::Quadratic, &fx.realm, &fx.community_mint, &member, 316).await;
    let max_record = write_max_voter_weight_record(&fx.ledger, PluginKind::Quadratic, &fx.realm, &fx.community_mint, 1_000).await;
    fx.cache.invalidate(&record).await;
    fx.cache.invalidate(&max_record).await;
    println!("[Setup] Quadratic records created on chain");

    let second = service
        .get_pre_vote_operations(&fx.realm, Population::Community, &member, action)
        .await
        .unwrap();
    let update = instruction_discriminator("update_voter_weight_record");
    assert_eq!(second.pre.len(), 2);
    assert!(second.pre.iter().all(|ix| method(&ix.data) == update));
    println!("[TEST END] test_operations_are_idempotent - Only updates remain");
}

#[tokio::test]
async fn test_batches_preserve_operation_order() {
    println!("[TEST START] test_batches_preserve_operation_order");
    let fx = setup_realm().await;
    let member = Pubkey::new_unique();
    let payer = Pubkey::new_unique();
    write_locked_stake_registrar(&fx.ledger, &fx.realm, &fx.community_mint).await;
    write_quadratic_registrar(&fx.ledger, &fx.realm, &fx.community_mint, square_root(), None).await;
    println!("[Setup] Member has no locked stake voter yet");

    let service = fx.service_with_batch(vec![plugin(PluginKind::LockedStake), plugin(PluginKind::Quadratic)], 3);
    let action = GovernanceAction::CastVote {
        proposal: Pubkey::new_unique(),
    };
    let ops = service
        .get_pre_vote_operations(&fx.realm, Population::Community, &member, action)
        .await
        .unwrap();
    let batches = service
        .get_pre_vote_batches(&fx.realm, Population::Community, &member, action, &payer)
        .await
        .unwrap();

    assert_eq!(ops.pre.len(), 5);
    assert_eq!(method(&ops.pre[0].data), instruction_discriminator("create_voter"));
    assert_eq!(batches.pre.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 2]);

    let flattened: Vec<_> = batches.pre.iter().flatten().map(|ix| (ix.program_id, ix.data.clone())).collect();
    let expected: Vec<_> = ops.pre.iter().map(|ix| (ix.program_id, ix.data.clone())).collect();
    assert_eq!(flattened, expected);

    // The payer funds the voter creation
    assert!(batches.pre[0][0]
        .accounts
        .iter()
        .any(|meta| meta.pubkey == payer && meta.is_signer && meta.is_writable));
    println!("[TEST END] test_batches_preserve_operation_order - 5 operations in 2 batches");
}

#[tokio::test]
async fn test_nft_cast_vote_is_chunked() {
    println!("[TEST START] test_nft_cast_vote_is_chunked");
    let fx = setup_realm().await;
    let member = Pubkey::new_unique();
    let collection = Pubkey::new_unique();
    let proposal = Pubkey::new_unique();
    write_nft_registrar(
        &fx.ledger,
        &fx.realm,
        &fx.community_mint,
        vec![CollectionConfig::new(&collection, 100, 1)],
    )
    .await;
    let nfts = give_nfts(&fx.ledger, &member, &collection, 7).await;
    write_nft_vote_record(&fx.ledger, &proposal, &nfts[0].mint, &member).await;
    println!("[Setup] 7 NFTs, one already voted");

    let service = fx.service(vec![plugin(PluginKind::NftHolding)]);
    let ops = service
        .get_pre_vote_operations(&fx.realm, Population::Community, &member, GovernanceAction::CastVote { proposal })
        .await
        .unwrap();

    let cast = instruction_discriminator("cast_nft_vote");
    let casts: Vec<_> = ops.pre.iter().filter(|ix| method(&ix.data) == cast).collect();
    assert_eq!(ops.pre.len(), 4);
    assert_eq!(casts.len(), 2);
    // Five NFTs per instruction, three remaining accounts each
    assert_eq!(
        casts[0].accounts.len() - casts[1].accounts.len(),
        (MAX_NFTS_PER_CAST_VOTE - 1) * 3
    );
    println!("[TEST END] test_nft_cast_vote_is_chunked - 6 fresh NFTs in 2 instructions");
}

#[tokio::test]
async fn test_nft_relinquish_runs_after_governance_instruction() {
    println!("[TEST START] test_nft_relinquish_runs_after_governance_instruction");
    let fx = setup_realm().await;
    let member = Pubkey::new_unique();
    let collection = Pubkey::new_unique();
    let proposal = Pubkey::new_unique();
    write_locked_stake_registrar(&fx.ledger, &fx.realm, &fx.community_mint).await;
    write_locked_stake_voter(&fx.ledger, &fx.realm, &fx.community_mint, &member, 1_000).await;
    write_nft_registrar(
        &fx.ledger,
        &fx.realm,
        &fx.community_mint,
        vec![CollectionConfig::new(&collection, 100, 1)],
    )
    .await;
    let nfts = give_nfts(&fx.ledger, &member, &collection, 2).await;
    write_nft_vote_record(&fx.ledger, &proposal, &nfts[0].mint, &member).await;
    println!("[Setup] Member voted with one of two NFTs");

    let service = fx.service(vec![
        plugin(PluginKind::LockedStake),
        plugin(PluginKind::NftHolding).additive(),
    ]);
    let ops = service
        .get_pre_vote_operations(
            &fx.realm,
            Population::Community,
            &member,
            GovernanceAction::RelinquishVote {
                governance: Pubkey::new_unique(),
                proposal,
            },
        )
        .await
        .unwrap();

    assert!(ops.pre.is_empty());
    assert_eq!(ops.post.len(), 1);
    assert_eq!(ops.post[0].program_id, NFT_VOTER_PROGRAM_ID);
    assert_eq!(method(&ops.post[0].data), instruction_discriminator("relinquish_nft_vote"));

    let (voted, _) = voter_weight_client::address::nft_vote_record(&NFT_VOTER_PROGRAM_ID, &proposal, &nfts[0].mint).unwrap();
    let (unvoted, _) = voter_weight_client::address::nft_vote_record(&NFT_VOTER_PROGRAM_ID, &proposal, &nfts[1].mint).unwrap();
    assert!(ops.post[0].accounts.iter().any(|meta| meta.pubkey == voted));
    assert!(!ops.post[0].accounts.iter().any(|meta| meta.pubkey == unvoted));
    println!("[TEST END] test_nft_relinquish_runs_after_governance_instruction - Relinquish in post");
}

#[tokio::test]
async fn test_on_chain_config_walks_plugin_chain() {
    println!("[TEST START] test_on_chain_config_walks_plugin_chain");
    let fx = setup_realm().await;
    let member = Pubkey::new_unique();
    write_realm_config(&fx.ledger, &fx.realm, Some(&QUADRATIC_PROGRAM_ID), None).await;
    write_locked_stake_registrar(&fx.ledger, &fx.realm, &fx.community_mint).await;
    write_locked_stake_voter(&fx.ledger, &fx.realm, &fx.community_mint, &member, 1_000).await;
    write_quadratic_registrar(
        &fx.ledger,
        &fx.realm,
        &fx.community_mint,
        square_root(),
        Some(&LOCKED_STAKE_PROGRAM_ID),
    )
    .await;
    println!("[Setup] Realm config points at quadratic, which chains to locked stake");

    let source = OnChainRealmConfig::new(
        fx.cache.clone(),
        ProgramDirectory::default(),
        GOVERNANCE_PROGRAM_ID,
        HashSet::new(),
    );
    let config = source.load(&fx.realm).await.unwrap();
    let programs: Vec<Pubkey> = config.community.plugins.iter().map(|p| p.program_id).collect();
    assert_eq!(programs, vec![LOCKED_STAKE_PROGRAM_ID, QUADRATIC_PROGRAM_ID]);
    assert!(!config.community.plugins[0].required);
    assert!(config.community.plugins[1].required);
    assert!(config.council.as_ref().unwrap().plugins.is_empty());

    let service = VoterWeightService::new(fx.cache.clone(), Arc::new(source), PluginRegistry::default(), 10);
    let weight = service
        .get_calculated_weight(&fx.realm, Population::Community, &member)
        .await
        .unwrap();
    assert_eq!(weight.total_weight, 316);

    // Same realm through the TOML-configured constructor
    let pipeline = PipelineConfig {
        rpc_endpoint: ENDPOINT.to_string(),
        retry: RetryPolicy::none(),
        ..PipelineConfig::default()
    };
    let service = VoterWeightService::from_config(&pipeline, Arc::new(fx.ledger.clone())).unwrap();
    let weight = service
        .get_calculated_weight(&fx.realm, Population::Community, &member)
        .await
        .unwrap();
    assert_eq!(weight.total_weight, 316);
    println!("[TEST END] test_on_chain_config_walks_plugin_chain - Chain recovered from registrars");
}

#[tokio::test]
async fn test_on_chain_config_reads_council_addin() {
    println!("[TEST START] test_on_chain_config_reads_council_addin");
    let fx = setup_realm().await;
    let member = Pubkey::new_unique();
    write_realm_config_bytes(&fx.ledger, &fx.realm, &LOCKED_STAKE_PROGRAM_ID, &TOKEN_VOTER_PROGRAM_ID).await;
    write_token_voter_registrar(&fx.ledger, &fx.realm, &fx.council_mint, &[(fx.council_mint, 0)]).await;
    write_token_voter(&fx.ledger, &fx.realm, &fx.council_mint, &member, &[(0, 3)]).await;
    write_token_owner_record(&fx.ledger, &fx.realm, &fx.council_mint, &member, 1).await;
    println!("[Setup] Council addin is token deposit, vanilla deposit differs");

    let source = OnChainRealmConfig::new(
        fx.cache.clone(),
        ProgramDirectory::default(),
        GOVERNANCE_PROGRAM_ID,
        HashSet::new(),
    );
    let config = source.load(&fx.realm).await.unwrap();
    let council: Vec<Pubkey> = config
        .council
        .as_ref()
        .unwrap()
        .plugins
        .iter()
        .map(|p| p.program_id)
        .collect();
    assert_eq!(council, vec![TOKEN_VOTER_PROGRAM_ID]);
    assert!(config.council.as_ref().unwrap().plugins[0].required);
    assert_eq!(config.community.plugins[0].program_id, LOCKED_STAKE_PROGRAM_ID);

    let service = VoterWeightService::new(fx.cache.clone(), Arc::new(source), PluginRegistry::default(), 10);
    let weight = service
        .get_calculated_weight(&fx.realm, Population::Council, &member)
        .await
        .unwrap();
    println!("[Action] Council weight: {}", weight.total_weight);

    assert_eq!(weight.total_weight, 3);
    assert_eq!(weight.details.len(), 1);
    assert_eq!(weight.details[0].plugin_name, "token-deposit");
    println!("[TEST END] test_on_chain_config_reads_council_addin - Council plugin discovered");
}

#[tokio::test]
async fn test_superseded_computation_is_not_published() {
    println!("[TEST START] test_superseded_computation_is_not_published");
    let fx = setup_realm().await;
    let slow = Pubkey::new_unique();
    let fast = Pubkey::new_unique();
    write_locked_stake_registrar(&fx.ledger, &fx.realm, &fx.community_mint).await;
    let slow_voter = write_locked_stake_voter(&fx.ledger, &fx.realm, &fx.community_mint, &slow, 1_000).await;
    write_locked_stake_voter(&fx.ledger, &fx.realm, &fx.community_mint, &fast, 2_000).await;
    fx.ledger.set_latency(slow_voter, Duration::from_millis(300)).await;
    println!("[Setup] First member's voter read is slow");

    let service = fx.service(vec![plugin(PluginKind::LockedStake)]);
    let slow_key = ComputationKey::new(fx.realm, Population::Community, slow);
    let fast_key = ComputationKey::new(fx.realm, Population::Community, fast);
    service.select(slow_key);

    let (stale, _) = tokio::join!(service.refresh_selected_weight(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        service.select(fast_key);
    });
    println!("[Action] Selection changed while the first computation was in flight");

    assert_eq!(stale.unwrap(), Tracked::Superseded);
    assert!(service.published_weight().await.is_none());

    let current = service.refresh_selected_weight().await.unwrap();
    let Tracked::Current(weight) = current else {
        panic!("selected computation should complete");
    };
    assert_eq!(weight.total_weight, 2_000);

    let (key, published) = service.published_weight().await.unwrap();
    assert_eq!(key, fast_key);
    assert_eq!(published, weight);
    println!("[TEST END] test_superseded_computation_is_not_published - Only the current selection published");
}

#[tokio::test]
async fn test_interleaved_refreshes_publish_latest_selection() {
    println!("[TEST START] test_interleaved_refreshes_publish_latest_selection");
    let fx = setup_realm().await;
    let members = [Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique()];
    let latencies = [200, 100, 0];
    write_locked_stake_registrar(&fx.ledger, &fx.realm, &fx.community_mint).await;
    for (i, (member, latency)) in members.iter().zip(latencies).enumerate() {
        let voter = write_locked_stake_voter(&fx.ledger, &fx.realm, &fx.community_mint, member, 1_000 * (i as u64 + 1)).await;
        fx.ledger.set_latency(voter, Duration::from_millis(latency)).await;
    }
    println!("[Setup] Three members with decreasing voter read latency");

    let service = fx.service(vec![plugin(PluginKind::LockedStake)]);
    let keys = members.map(|member| ComputationKey::new(fx.realm, Population::Community, member));
    service.select(keys[0]);

    let (first, second, third) = tokio::join!(
        service.refresh_selected_weight(),
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            service.select(keys[1]);
            service.refresh_selected_weight().await
        },
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            service.select(keys[2]);
            service.refresh_selected_weight().await
        },
    );
    println!("[Action] Selection changed twice while refreshes were in flight");

    assert_eq!(first.unwrap(), Tracked::Superseded);
    assert_eq!(second.unwrap(), Tracked::Superseded);
    let Tracked::Current(weight) = third.unwrap() else {
        panic!("last selection should complete");
    };
    assert_eq!(weight.total_weight, 3_000);

    // Let any straggling reads finish before checking what was published
    tokio::time::sleep(Duration::from_millis(250)).await;
    let (key, published) = service.published_weight().await.unwrap();
    assert_eq!(key, keys[2]);
    assert_eq!(published.total_weight, 3_000);
    println!("[TEST END] test_interleaved_refreshes_publish_latest_selection - Latest selection published");
}
