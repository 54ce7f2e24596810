//! Gameplay consumers of the proximity views: coin pickups, the hat vendor
//! and billboard timers.

use crate::proximity::Proximity;
use warren_core::assets::TextureProvider;
use warren_core::ecs::{
    Billboard, BillboardState, Collider, ComponentKind, Entity, Inventory, Item, ItemKind, Position,
    Sprite, SpriteRect, Vendor, World,
};
use warren_services::{Button, InputState};

pub const HAT_TEXTURE_PATH: &str = "assets/images/player_hat.png";
const HAT_SPRITE_SIZE: f32 = 16.0;

/// Vendors start following their customer at this distance and speed.
const VENDOR_FOLLOW_DISTANCE: f32 = 30.0;
const VENDOR_FOLLOW_SPEED: f32 = 90.0;

/// Extra reach around the player's collider for the vendor hint.
const VENDOR_HINT_PAD: f32 = 30.0;

/// Result of an interaction with a vendor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Purchase {
    Bought { price: u32 },
    AlreadyOwned,
    NotEnoughCoins { price: u32, coins: u32 },
    /// The vendor sells nothing the player can buy.
    Unavailable,
}

/// Collect coins whose trigger range an inventory holder just entered.
pub fn pickups_system(world: &mut World, proximity: &Proximity) {
    let entered: Vec<_> = proximity.enter(world).collect();
    for pair in entered {
        let (Some(owner), Some(coin)) = (
            world.index_checked(pair.trigger_owner),
            world.index_checked(pair.matched),
        ) else {
            continue;
        };
        if world.at::<Item>(coin).map(|item| item.kind) != Some(ItemKind::Coin) {
            continue;
        }
        let Some(inventory) = world.at_mut::<Inventory>(owner) else {
            continue;
        };
        inventory.coins += 1;
        let coins = inventory.coins;
        world.destroy(pair.matched);
        tracing::info!(coins, "picked up a coin");
    }
}

/// On an interact press, trade with the nearest vendor currently in range.
pub fn interact_system(
    world: &mut World,
    proximity: &Proximity,
    input: &InputState,
    textures: &mut dyn TextureProvider,
) -> Option<Purchase> {
    if !input.was_pressed(Button::Interact) {
        return None;
    }
    let player = world.find_player()?;
    if !world.has_all(player, ComponentKind::Position | ComponentKind::Collider) {
        return None;
    }
    let vendor = nearest_vendor(world, proximity, player)?;
    Some(try_buy_hat(world, player, vendor, textures))
}

fn nearest_vendor(world: &World, proximity: &Proximity, player: Entity) -> Option<Entity> {
    let player_pos = world.get_position(player)?;
    let mut best: Option<(f32, Entity)> = None;
    for pair in proximity.stay(world) {
        let vendor = if pair.matched == player && world.has(pair.trigger_owner, ComponentKind::Vendor) {
            pair.trigger_owner
        } else if pair.trigger_owner == player && world.has(pair.matched, ComponentKind::Vendor) {
            pair.matched
        } else {
            continue;
        };
        let Some(pos) = world.get_position(vendor) else {
            continue;
        };
        let d2 = (pos.as_vec2() - player_pos.as_vec2()).length_squared();
        if best.map_or(true, |(best_d2, _)| d2 < best_d2) {
            best = Some((d2, vendor));
        }
    }
    best.map(|(_, vendor)| vendor)
}

/// Buy the vendor's hat. A successful purchase swaps the player's sprite,
/// hides the vendor's hint and makes the vendor follow the player.
pub fn try_buy_hat(
    world: &mut World,
    player: Entity,
    vendor: Entity,
    textures: &mut dyn TextureProvider,
) -> Purchase {
    let Some(offer) = world.get::<Vendor>(vendor).copied() else {
        return Purchase::Unavailable;
    };
    if offer.sells != ItemKind::Hat {
        return Purchase::Unavailable;
    }
    let Some(inventory) = world.get_mut::<Inventory>(player) else {
        return Purchase::Unavailable;
    };
    if inventory.has_hat {
        tracing::info!("player already has a hat");
        return Purchase::AlreadyOwned;
    }
    if inventory.coins < offer.price {
        let coins = inventory.coins;
        tracing::info!(price = offer.price, coins, "not enough coins for a hat");
        return Purchase::NotEnoughCoins {
            price: offer.price,
            coins,
        };
    }
    inventory.coins -= offer.price;
    inventory.has_hat = true;

    if let Some(sprite) = world.get_mut::<Sprite>(player) {
        if textures.is_valid(sprite.texture) {
            textures.release(sprite.texture);
        }
        sprite.texture = textures.acquire(HAT_TEXTURE_PATH);
        sprite.src = SpriteRect {
            x: 0.0,
            y: 0.0,
            w: HAT_SPRITE_SIZE,
            h: HAT_SPRITE_SIZE,
        };
        sprite.origin_x = HAT_SPRITE_SIZE * 0.5;
        sprite.origin_y = HAT_SPRITE_SIZE * 0.5;
    }
    if let Some(billboard) = world.get_mut::<Billboard>(vendor) {
        billboard.state = BillboardState::Inactive;
    }
    // Next row of the vendor sheet is the same pose without the hat.
    if let Some(sprite) = world.get_mut::<Sprite>(vendor) {
        sprite.src.y += HAT_SPRITE_SIZE;
    }
    world.add_follow(vendor, player, VENDOR_FOLLOW_DISTANCE, VENDOR_FOLLOW_SPEED, 0.0);

    tracing::info!(price = offer.price, "bought a hat");
    Purchase::Bought { price: offer.price }
}

/// Decay billboard timers, then refresh any billboard with something in range.
pub fn billboards_system(world: &mut World, proximity: &Proximity, dt: f32) {
    let boards: Vec<usize> = world.indices_with(ComponentKind::Billboard.into()).collect();
    for &i in &boards {
        if let Some(board) = world.at_mut::<Billboard>(i) {
            board.timer = (board.timer - dt).max(0.0);
        }
    }

    let owners: Vec<Entity> = proximity.stay(world).map(|p| p.trigger_owner).collect();
    for owner in owners {
        if let Some(board) = world.get_mut::<Billboard>(owner) {
            board.timer = board.linger;
        }
    }
}

/// Coins and hat ownership of the player, zeroed when there is none.
pub fn player_stats(world: &World) -> Inventory {
    world
        .find_player()
        .and_then(|p| world.get::<Inventory>(p).copied())
        .unwrap_or_default()
}

/// Text and anchor for the "buy" prompt of a nearby vendor.
#[derive(Debug, Clone, PartialEq)]
pub struct VendorHint {
    pub vendor: Entity,
    pub x: f32,
    pub y: f32,
    pub text: String,
}

/// First vendor within a padded box around the player.
pub fn vendor_hint(world: &World) -> Option<VendorHint> {
    let player = world.find_player()?;
    let p = world.index_checked(player)?;
    let (pp, pc) = (world.at::<Position>(p)?, world.at::<Collider>(p)?);

    let required = ComponentKind::Vendor | ComponentKind::Collider | ComponentKind::Position;
    world.indices_with(required).filter(|&v| v != p).find_map(|v| {
        let (vp, vc, offer) = (
            world.at::<Position>(v)?,
            world.at::<Collider>(v)?,
            world.at::<Vendor>(v)?,
        );
        let within_x = (pp.x - vp.x).abs() <= pc.hx + vc.hx + VENDOR_HINT_PAD;
        let within_y = (pp.y - vp.y).abs() <= pc.hy + vc.hy + VENDOR_HINT_PAD;
        (within_x && within_y).then(|| VendorHint {
            vendor: world.handle_at(v),
            x: vp.x,
            y: vp.y,
            text: format!("Press E to buy hat ({})", offer.price),
        })
    })
}
