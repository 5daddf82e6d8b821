//! Contract interface bindings for token and vault reads plus calldata
//! construction. The asynchronous vault functions cover only the request
//! half of the request/settle/claim lifecycle; claims are driven elsewhere.

use alloy::sol;

sol! {
    #![sol(all_derives = true)]

    #[sol(rpc)]
    interface IERC20 {
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function approve(address spender, uint256 value) external returns (bool);
    }

    #[sol(rpc)]
    interface IERC4626 {
        function asset() external view returns (address);
        function totalAssets() external view returns (uint256);
        function totalSupply() external view returns (uint256);
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function paused() external view returns (bool);
        function deposit(uint256 assets, address receiver) external returns (uint256 shares);
        function redeem(uint256 shares, address receiver, address owner) external returns (uint256 assets);
    }

    interface IERC7540 {
        function requestDeposit(uint256 assets, address receiver, address owner) external returns (uint256 requestId);
        function requestRedeem(uint256 shares, address receiver, address owner) external returns (uint256 requestId);
    }
}
