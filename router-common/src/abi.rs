//! ABI wire format of a `SwapRoute` and of the per-venue auxiliary data.
//!
//! The route is encoded as one tuple:
//!
//! ```text
//! (
//!   (string venue, address[] path, address pool, uint256 percent,
//!    uint256 groupId, uint256 parentGroupId, bytes auxData)[] steps,
//!   (uint256 id, uint256 percent)[] parentGroups,
//!   address destination, address tokenIn, address tokenOut,
//!   uint256 groupCount, uint256 deadline, uint256 amountIn, uint256 amountOutMin,
//!   bool unwrapNative
//! )
//! ```

use ethabi::{Address as H160, ParamType, Token as AbiToken, Uint};
use num_bigint::BigUint;

use crate::{
    models::{Address, Group, RouteError, SwapRoute, SwapStep, ADDRESS_LENGTH},
    Bytes,
};

/// Highest coin index accepted in curve auxiliary data.
const MAX_CURVE_COINS: u32 = 8;

fn step_type() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::String,
        ParamType::Array(Box::new(ParamType::Address)),
        ParamType::Address,
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Bytes,
    ])
}

fn group_type() -> ParamType {
    ParamType::Tuple(vec![ParamType::Uint(256), ParamType::Uint(256)])
}

fn route_type() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::Array(Box::new(step_type())),
        ParamType::Array(Box::new(group_type())),
        ParamType::Address,
        ParamType::Address,
        ParamType::Address,
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Bool,
    ])
}

pub fn encode_route(route: &SwapRoute) -> Result<Vec<u8>, RouteError> {
    let steps = route
        .steps
        .iter()
        .map(encode_step)
        .collect::<Result<Vec<_>, _>>()?;
    let groups = route
        .parent_groups
        .iter()
        .map(|group| {
            AbiToken::Tuple(vec![
                AbiToken::Uint(Uint::from(group.id)),
                AbiToken::Uint(Uint::from(group.percent)),
            ])
        })
        .collect();

    let tuple = AbiToken::Tuple(vec![
        AbiToken::Array(steps),
        AbiToken::Array(groups),
        address_token(&route.destination)?,
        address_token(&route.token_in)?,
        address_token(&route.token_out)?,
        AbiToken::Uint(Uint::from(route.group_count)),
        AbiToken::Uint(Uint::from(route.deadline)),
        AbiToken::Uint(biguint_to_uint(&route.amount_in)?),
        AbiToken::Uint(biguint_to_uint(&route.amount_out_min)?),
        AbiToken::Bool(route.unwrap_native),
    ]);
    Ok(ethabi::encode(&[tuple]))
}

fn encode_step(step: &SwapStep) -> Result<AbiToken, RouteError> {
    Ok(AbiToken::Tuple(vec![
        AbiToken::String(step.venue.clone()),
        AbiToken::Array(vec![address_token(&step.path[0])?, address_token(&step.path[1])?]),
        address_token(&step.pool)?,
        AbiToken::Uint(Uint::from(step.percent)),
        AbiToken::Uint(Uint::from(step.group_id)),
        AbiToken::Uint(Uint::from(step.parent_group_id)),
        AbiToken::Bytes(step.aux_data.to_vec()),
    ]))
}

pub fn decode_route(data: &[u8]) -> Result<SwapRoute, RouteError> {
    let mut tokens = ethabi::decode(&[route_type()], data)
        .map_err(|e| RouteError::Decode(e.to_string()))?;
    let mut fields = match tokens.pop() {
        Some(AbiToken::Tuple(fields)) if fields.len() == 10 => fields.into_iter(),
        _ => return Err(RouteError::Decode("expected a route tuple".to_string())),
    };

    let steps = into_array(next(&mut fields)?)?
        .into_iter()
        .enumerate()
        .map(|(index, token)| decode_step(index, token))
        .collect::<Result<Vec<_>, _>>()?;
    let parent_groups = into_array(next(&mut fields)?)?
        .into_iter()
        .map(decode_group)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SwapRoute {
        steps,
        parent_groups,
        destination: into_address(next(&mut fields)?)?,
        token_in: into_address(next(&mut fields)?)?,
        token_out: into_address(next(&mut fields)?)?,
        group_count: into_u32(next(&mut fields)?, "groupCount")?,
        deadline: into_u64(next(&mut fields)?, "deadline")?,
        amount_in: uint_to_biguint(&into_uint(next(&mut fields)?)?),
        amount_out_min: uint_to_biguint(&into_uint(next(&mut fields)?)?),
        unwrap_native: match next(&mut fields)? {
            AbiToken::Bool(flag) => flag,
            other => return Err(unexpected("bool", &other)),
        },
    })
}

fn decode_step(index: usize, token: AbiToken) -> Result<SwapStep, RouteError> {
    let mut fields = into_tuple(token, 7)?.into_iter();

    let venue = match next(&mut fields)? {
        AbiToken::String(venue) => venue,
        other => return Err(unexpected("string", &other)),
    };
    let path = into_array(next(&mut fields)?)?
        .into_iter()
        .map(into_address)
        .collect::<Result<Vec<_>, _>>()?;
    let path: [Address; 2] = path
        .try_into()
        .map_err(|path: Vec<Address>| RouteError::InvalidPath {
            step: index,
            reason: format!("expected 2 assets, got {}", path.len()),
        })?;

    Ok(SwapStep {
        venue,
        path,
        pool: into_address(next(&mut fields)?)?,
        percent: into_u32(next(&mut fields)?, "percent")?,
        group_id: into_u32(next(&mut fields)?, "groupId")?,
        parent_group_id: into_u32(next(&mut fields)?, "parentGroupId")?,
        aux_data: match next(&mut fields)? {
            AbiToken::Bytes(data) => Bytes::from(data),
            other => return Err(unexpected("bytes", &other)),
        },
    })
}

fn decode_group(token: AbiToken) -> Result<Group, RouteError> {
    let mut fields = into_tuple(token, 2)?.into_iter();
    Ok(Group {
        id: into_u32(next(&mut fields)?, "group id")?,
        percent: into_u32(next(&mut fields)?, "group percent")?,
    })
}

/// Encodes the `(int128 i, int128 j)` coin indices of a curve step.
pub fn encode_curve_indices(i: u32, j: u32) -> Bytes {
    ethabi::encode(&[AbiToken::Int(Uint::from(i)), AbiToken::Int(Uint::from(j))]).into()
}

pub fn decode_curve_indices(aux: &[u8]) -> Result<(u32, u32), RouteError> {
    let tokens = ethabi::decode(&[ParamType::Int(128), ParamType::Int(128)], aux)
        .map_err(|e| RouteError::InvalidAuxData(format!("curve indices: {e}")))?;
    let mut indices = tokens.into_iter().map(|token| match token {
        AbiToken::Int(value) if value < Uint::from(MAX_CURVE_COINS) => Ok(value.low_u32()),
        other => Err(RouteError::InvalidAuxData(format!("invalid curve coin index {other:?}"))),
    });
    match (indices.next(), indices.next()) {
        (Some(i), Some(j)) => Ok((i?, j?)),
        _ => Err(RouteError::InvalidAuxData("curve indices: expected two values".to_string())),
    }
}

/// Static pool parameters of a lock/callback pool: `(uint24 fee, int24 tickSpacing, address
/// hooks)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolParams {
    pub fee: u32,
    pub tick_spacing: u32,
    pub hooks: Address,
}

/// Largest value representable by the `uint24`/`int24` pool parameter fields.
const MAX_UINT24: u32 = (1 << 24) - 1;
const MAX_INT24: u32 = (1 << 23) - 1;

pub fn encode_pool_params(params: &PoolParams) -> Result<Bytes, RouteError> {
    if params.fee > MAX_UINT24 || params.tick_spacing > MAX_INT24 {
        return Err(RouteError::Encode(format!("pool parameters out of range: {params:?}")));
    }
    Ok(ethabi::encode(&[
        AbiToken::Uint(Uint::from(params.fee)),
        AbiToken::Int(Uint::from(params.tick_spacing)),
        address_token(&params.hooks)?,
    ])
    .into())
}

pub fn decode_pool_params(aux: &[u8]) -> Result<PoolParams, RouteError> {
    let tokens =
        ethabi::decode(&[ParamType::Uint(24), ParamType::Int(24), ParamType::Address], aux)
            .map_err(|e| RouteError::InvalidAuxData(format!("pool parameters: {e}")))?;
    match tokens.as_slice() {
        [AbiToken::Uint(fee), AbiToken::Int(tick_spacing), AbiToken::Address(hooks)]
            if *fee <= Uint::from(MAX_UINT24) &&
                !tick_spacing.is_zero() &&
                *tick_spacing <= Uint::from(MAX_INT24) =>
        {
            Ok(PoolParams {
                fee: fee.low_u32(),
                tick_spacing: tick_spacing.low_u32(),
                hooks: Bytes::from(hooks.as_bytes()),
            })
        }
        _ => Err(RouteError::InvalidAuxData(format!("invalid pool parameters {tokens:?}"))),
    }
}

/// Balancer pool ids are carried verbatim as 32 raw bytes.
pub fn decode_pool_id(aux: &[u8]) -> Result<[u8; 32], RouteError> {
    aux.try_into().map_err(|_| {
        RouteError::InvalidAuxData(format!("pool id must be 32 bytes, got {}", aux.len()))
    })
}

pub fn biguint_to_uint(value: &BigUint) -> Result<Uint, RouteError> {
    let bytes = value.to_bytes_be();
    if bytes.len() > 32 {
        return Err(RouteError::Encode(format!("{value} does not fit in 256 bits")));
    }
    Ok(Uint::from_big_endian(&bytes))
}

pub fn uint_to_biguint(value: &Uint) -> BigUint {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    BigUint::from_bytes_be(&bytes)
}

fn address_token(address: &Address) -> Result<AbiToken, RouteError> {
    if address.len() != ADDRESS_LENGTH {
        return Err(RouteError::Encode(format!("{address} is not a {ADDRESS_LENGTH} byte address")));
    }
    Ok(AbiToken::Address(H160::from_slice(address)))
}

fn next(fields: &mut impl Iterator<Item = AbiToken>) -> Result<AbiToken, RouteError> {
    fields
        .next()
        .ok_or_else(|| RouteError::Decode("missing tuple field".to_string()))
}

fn unexpected(expected: &str, token: &AbiToken) -> RouteError {
    RouteError::Decode(format!("expected {expected}, got {token:?}"))
}

fn into_tuple(token: AbiToken, len: usize) -> Result<Vec<AbiToken>, RouteError> {
    match token {
        AbiToken::Tuple(fields) if fields.len() == len => Ok(fields),
        other => Err(unexpected(&format!("tuple of {len}"), &other)),
    }
}

fn into_array(token: AbiToken) -> Result<Vec<AbiToken>, RouteError> {
    match token {
        AbiToken::Array(items) => Ok(items),
        other => Err(unexpected("array", &other)),
    }
}

fn into_address(token: AbiToken) -> Result<Address, RouteError> {
    match token {
        AbiToken::Address(address) => Ok(Bytes::from(address.as_bytes())),
        other => Err(unexpected("address", &other)),
    }
}

fn into_uint(token: AbiToken) -> Result<Uint, RouteError> {
    match token {
        AbiToken::Uint(value) => Ok(value),
        other => Err(unexpected("uint256", &other)),
    }
}

fn into_u32(token: AbiToken, field: &str) -> Result<u32, RouteError> {
    let value = into_uint(token)?;
    if value > Uint::from(u32::MAX) {
        return Err(RouteError::Decode(format!("{field} {value} exceeds u32")));
    }
    Ok(value.low_u32())
}

fn into_u64(token: AbiToken, field: &str) -> Result<u64, RouteError> {
    let value = into_uint(token)?;
    if value > Uint::from(u64::MAX) {
        return Err(RouteError::Decode(format!("{field} {value} exceeds u64")));
    }
    Ok(value.low_u64())
}
